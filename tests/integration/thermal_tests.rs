//! Thermal protection through the board service: thermistor ADC codes in,
//! lockouts, restores and fan drive out.

use pdu::app::commands::{AppCommand, ChannelCommand, OverrideAction, OverrideRequest};
use pdu::app::events::AppEvent;
use pdu::config::SystemConfig;
use pdu::control::fan_level::FanLevel;
use pdu::drivers::fan::firing_delay_us;
use pdu::error::{CommandError, SensorError};
use pdu::model::{ChannelKind, OutputIndex};
use pdu::sensing::thermistor::ntc_celsius;

use crate::mock_hw::{IsrState, MockHardware, RecordingSink, TestService, started_service};

const THERMAL_MS: u32 = 2000;

/// ADC code whose conversion lands closest to `target_c`.
fn code_for(target_c: f32) -> u16 {
    let p = SystemConfig::default().ntc_params();
    (1..p.adc_max)
        .min_by(|&a, &b| {
            let da = (ntc_celsius(a, &p).unwrap() - target_c).abs();
            let db = (ntc_celsius(b, &p).unwrap() - target_c).abs();
            da.total_cmp(&db)
        })
        .unwrap()
}

fn switch(svc: &mut TestService<'_>, hw: &mut MockHardware, sink: &mut RecordingSink, y: u8, on: bool) {
    svc.handle_command(
        ChannelCommand {
            kind: ChannelKind::Y,
            number: y,
            on,
        },
        hw,
        sink,
    )
    .unwrap();
}

fn set_override(svc: &mut TestService<'_>, module: u8, t: f32) {
    svc.request_override(module, OverrideAction::Set(t)).unwrap();
}

/// Advance to the `n`th thermal tick.
fn thermal_tick(svc: &mut TestService<'_>, hw: &mut MockHardware, sink: &mut RecordingSink, n: u32) {
    let now_ms = n * THERMAL_MS;
    svc.poll(now_ms, u64::from(now_ms) * 1000, hw, sink);
}

#[test]
fn hot_thermistor_locks_its_module_and_restores_saved_mask() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    // Module 1 = Y4..Y7: {on, off, on, off}
    switch(&mut svc, &mut hw, &mut sink, 4, true);
    switch(&mut svc, &mut hw, &mut sink, 6, true);
    switch(&mut svc, &mut hw, &mut sink, 0, true);

    hw.thermistor[1] = code_for(80.0);
    thermal_tick(&mut svc, &mut hw, &mut sink, 1);

    assert!(svc.modules()[1].is_locked());
    assert_eq!(svc.modules()[1].pre_lock_mask(), 0b0101);
    assert_eq!(hw.module_on_mask(1), 0);
    assert!(hw.is_on(OutputIndex::new(ChannelKind::Y, 0).unwrap()));
    assert_eq!(sink.thermal_alerts(), [(1, true)]);

    // Inside the hysteresis band.
    hw.thermistor[1] = code_for(74.0);
    thermal_tick(&mut svc, &mut hw, &mut sink, 2);
    assert!(svc.modules()[1].is_locked());

    hw.thermistor[1] = code_for(65.0);
    thermal_tick(&mut svc, &mut hw, &mut sink, 3);
    assert!(!svc.modules()[1].is_locked());
    assert_eq!(hw.module_on_mask(1), 0b0101);
    assert_eq!(sink.thermal_alerts(), [(1, true), (1, false)]);
}

#[test]
fn override_drives_lockout_and_clear_returns_to_thermistor() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    switch(&mut svc, &mut hw, &mut sink, 9, true);
    svc.dispatch(
        AppCommand::OverrideTemperature(OverrideRequest {
            module: 2,
            action: OverrideAction::Set(90.0),
        }),
        &mut hw,
        &mut sink,
    )
    .unwrap();

    // Queued, not applied until the next thermal tick.
    assert_eq!(svc.modules()[2].override_c, None);
    thermal_tick(&mut svc, &mut hw, &mut sink, 1);
    assert_eq!(svc.modules()[2].override_c, Some(90.0));
    assert!(svc.modules()[2].is_locked());
    assert_eq!(hw.module_on_mask(2), 0);

    svc.request_override(2, OverrideAction::Clear).unwrap();
    thermal_tick(&mut svc, &mut hw, &mut sink, 2);
    assert!(!svc.modules()[2].is_locked());
    assert!(hw.is_on(OutputIndex::new(ChannelKind::Y, 9).unwrap()));

    assert_eq!(
        svc.request_override(4, OverrideAction::Clear),
        Err(CommandError::InvalidModule)
    );
}

#[test]
fn fan_follows_levels_with_configured_speeds() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let config = SystemConfig::default();
    let partial = config.fan_lvl1_speed_pct;
    let mut svc = started_service(&isr, config, &mut hw, &mut sink);

    assert_eq!(svc.fan_level(), FanLevel::Off);
    assert!(isr.zero_cross.is_armed());

    set_override(&mut svc, 0, 60.0);
    thermal_tick(&mut svc, &mut hw, &mut sink, 1);
    assert_eq!(svc.fan_level(), FanLevel::Partial);
    assert_eq!(svc.fan_speed_pct(), partial);

    thermal_tick(&mut svc, &mut hw, &mut sink, 2);
    assert_eq!(svc.fan_level(), FanLevel::Full);
    assert_eq!(svc.fan_speed_pct(), 100);
    // Full drive holds the gate on; no phase firing.
    assert!(!isr.zero_cross.is_armed());

    // Deadband between 50 and 55.
    set_override(&mut svc, 0, 52.0);
    thermal_tick(&mut svc, &mut hw, &mut sink, 3);
    assert_eq!(svc.fan_level(), FanLevel::Full);

    set_override(&mut svc, 0, 20.0);
    thermal_tick(&mut svc, &mut hw, &mut sink, 4);
    thermal_tick(&mut svc, &mut hw, &mut sink, 5);
    assert_eq!(svc.fan_level(), FanLevel::Off);
    assert_eq!(svc.fan_speed_pct(), 0);

    let changes = sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::FanLevelChanged { .. }))
        .count();
    assert_eq!(changes, 4);
}

#[test]
fn partial_fan_fires_once_per_zero_crossing_after_delay() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let config = SystemConfig::default();
    let delay = u64::from(firing_delay_us(config.fan_lvl1_speed_pct));
    let mut svc = started_service(&isr, config, &mut hw, &mut sink);

    set_override(&mut svc, 0, 40.0);
    thermal_tick(&mut svc, &mut hw, &mut sink, 1);
    assert_eq!(svc.fan_level(), FanLevel::Partial);

    let edge_us = 2_000_000 + 100;
    isr.zero_cross.on_rising_edge(edge_us);

    svc.poll(2000, edge_us + delay - 1, &mut hw, &mut sink);
    assert_eq!(isr.zero_cross.pending(), Some(edge_us));

    svc.poll(2000, edge_us + delay, &mut hw, &mut sink);
    assert_eq!(isr.zero_cross.pending(), None);
}

#[test]
fn rail_reading_is_a_fault_not_a_temperature() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    hw.thermistor[3] = 0;
    thermal_tick(&mut svc, &mut hw, &mut sink, 1);
    thermal_tick(&mut svc, &mut hw, &mut sink, 2);

    assert_eq!(svc.modules()[3].measured_c, None);
    assert!(!svc.modules()[3].is_locked());
    let faults: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::SensorFault { module, error } => Some((*module, *error)),
            _ => None,
        })
        .collect();
    assert_eq!(faults, [(3, SensorError::Shorted)]);

    hw.thermistor[3] = code_for(30.0);
    thermal_tick(&mut svc, &mut hw, &mut sink, 3);
    assert!(svc.modules()[3].measured_c.is_some());
    assert!(sink.notifications().contains(&"Sensor recovered"));
}

#[test]
fn all_thermistors_open_holds_fan_and_locks_nothing() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    hw.thermistor = [code_for(40.0); 4];
    thermal_tick(&mut svc, &mut hw, &mut sink, 1);
    assert_eq!(svc.fan_level(), FanLevel::Partial);

    hw.thermistor = [4095; 4];
    thermal_tick(&mut svc, &mut hw, &mut sink, 2);
    assert_eq!(svc.fan_level(), FanLevel::Partial);
    assert!(svc.modules().iter().all(|m| !m.is_locked()));
}
