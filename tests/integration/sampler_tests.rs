//! Current sampling, RMS windows and energy through the board service.

use pdu::config::SystemConfig;
use pdu::error::CommandError;

use crate::mock_hw::{IsrState, MID_SCALE, MockDelay, MockHardware, RecordingSink, started_service};

/// 12 sensored channels × 80 samples per window.
const FULL_ROUND: usize = 12 * 80;

fn amps_for(counts: u16) -> f32 {
    f32::from(counts) * SystemConfig::default().adc_to_amp()
}

#[test]
fn full_window_produces_rms_on_next_rms_pass() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    assert_eq!(isr.sampler.offset(0), MID_SCALE);

    hw.current[0] = MID_SCALE + 200;
    isr.run_sampler(&mut hw, FULL_ROUND);
    svc.poll(10, 10_000, &mut hw, &mut sink);

    assert!((svc.current_amps(0) - amps_for(200)).abs() < 1e-3);
    assert_eq!(svc.current_amps(1), 0.0);
    // Y3 has no sensor.
    assert_eq!(svc.current_amps(3), 0.0);
    assert_eq!(isr.sampler.sample_count(0), 0);
}

#[test]
fn partial_window_keeps_previous_reading() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    hw.current[0] = MID_SCALE + 200;
    isr.run_sampler(&mut hw, FULL_ROUND);
    svc.poll(10, 10_000, &mut hw, &mut sink);
    let first = svc.current_amps(0);

    hw.current[0] = MID_SCALE + 400;
    isr.run_sampler(&mut hw, FULL_ROUND / 2);
    svc.poll(20, 20_000, &mut hw, &mut sink);

    assert_eq!(svc.current_amps(0), first);
    assert_eq!(isr.sampler.sample_count(0), 40);
}

#[test]
fn readings_under_noise_floor_report_zero() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    // ~0.24 A, under the 0.5 A floor.
    hw.current[4] = MID_SCALE + 20;
    isr.run_sampler(&mut hw, FULL_ROUND);
    svc.poll(10, 10_000, &mut hw, &mut sink);

    assert_eq!(svc.current_amps(4), 0.0);
}

#[test]
fn sampler_is_held_off_while_adc_is_paused() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let _svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    {
        let _pause = isr.arbiter.pause();
        assert!(!isr.arbiter.gate().is_enabled());
        isr.run_sampler(&mut hw, FULL_ROUND);
    }
    assert!(isr.arbiter.gate().is_enabled());
    assert_eq!(isr.sampler.sample_count(0), 0);

    isr.run_sampler(&mut hw, 12);
    assert_eq!(isr.sampler.sample_count(0), 1);
}

#[test]
fn energy_accumulates_from_latest_rms() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    hw.current[0] = MID_SCALE + 200;
    isr.run_sampler(&mut hw, FULL_ROUND);
    svc.poll(10, 10_000, &mut hw, &mut sink);
    assert_eq!(svc.energy_wh(0), 0.0);

    svc.poll(1000, 1_000_000, &mut hw, &mut sink);
    let watts = amps_for(200) * 230.0;
    assert!((svc.power_watts(0) - watts).abs() < 1e-2);
    let wh = watts / 3600.0;
    assert!((svc.energy_wh(0) - wh).abs() < 1e-4);

    // Same RMS for another second doubles the total.
    svc.poll(2000, 2_000_000, &mut hw, &mut sink);
    assert!((svc.energy_wh(0) - 2.0 * wh).abs() < 1e-4);

    // A sensorless channel never gains energy.
    assert_eq!(svc.power_watts(7), 0.0);
    assert_eq!(svc.energy_wh(7), 0.0);
}

#[test]
fn calibration_records_per_channel_offsets() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    hw.current[5] = 2100;
    hw.current[6] = 1990;
    let mut sink = RecordingSink::new();
    let _svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    assert_eq!(isr.sampler.offset(5), 2100);
    assert_eq!(isr.sampler.offset(6), 1990);
    // Sensorless channels are never read.
    assert_eq!(isr.sampler.offset(7), 0);
    assert_eq!(isr.arbiter.depth(), 0);
}

#[test]
fn raw_capture_pauses_sampler_and_summarises() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    hw.current[2] = 2300;
    let disables_before = isr.arbiter.gate().disables.get();
    let cap = svc
        .capture_raw(&mut hw, &mut MockDelay::default(), 2, 50)
        .expect("Y2 has a sensor");
    assert_eq!(cap.samples, 50);
    assert_eq!((cap.min, cap.max), (2300, 2300));
    assert_eq!(cap.peak_to_peak(), 0);
    assert_eq!(cap.offset, MID_SCALE);
    assert_eq!(isr.arbiter.gate().disables.get(), disables_before + 1);
    assert!(isr.arbiter.gate().is_enabled());

    assert_eq!(
        svc.capture_raw(&mut hw, &mut MockDelay::default(), 3, 50).unwrap_err(),
        CommandError::InvalidChannel
    );
}
