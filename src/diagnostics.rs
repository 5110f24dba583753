//! Bench diagnostics: raw current-sensor capture and the output walk.
//!
//! Both are technician tools run from the serial terminal with the board
//! otherwise idle.  They block the control loop for their duration
//! (≤ 1 s for a capture, 32 × dwell for a walk), well inside the
//! watchdog timeout.

use embedded_hal::delay::DelayNs;
use serde::Serialize;

use crate::app::ports::{AdcPort, AnalogInput, OutputPort, SamplerGate};
use crate::error::CommandError;
use crate::model::{MODULE_COUNT, Module, OUTPUT_COUNT, OutputIndex, OutputTable};
use crate::sensing::arbiter::AdcArbiter;
use crate::sensing::current::CurrentSampler;

/// Upper bound on one capture (1 s at the default spacing).
pub const MAX_CAPTURE_SAMPLES: u16 = 1000;
/// 1 kHz raw capture.
pub const CAPTURE_SPACING_US: u32 = 1000;
/// Default on-time per output during a walk.
pub const WALK_DWELL_MS: u32 = 20;

/// Summary of a raw capture.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RawCapture {
    pub channel: u8,
    pub samples: u16,
    /// Zero-current offset found at calibration.
    pub offset: u16,
    pub min: u16,
    pub max: u16,
    pub mean: f32,
}

impl RawCapture {
    pub fn peak_to_peak(&self) -> u16 {
        self.max - self.min
    }
}

/// Read `samples` raw codes from one current sensor with the sampler held
/// off for the whole capture.
pub fn capture_raw<G: SamplerGate>(
    sampler: &CurrentSampler,
    arbiter: &AdcArbiter<G>,
    adc: &mut impl AdcPort,
    delay: &mut impl DelayNs,
    channel: usize,
    samples: u16,
    spacing_us: u32,
) -> Result<RawCapture, CommandError> {
    if !sampler.has_sensor(channel) {
        return Err(CommandError::InvalidChannel);
    }
    let samples = samples.clamp(1, MAX_CAPTURE_SAMPLES);
    let input = AnalogInput::Current(channel as u8);

    let mut min = u16::MAX;
    let mut max = 0;
    let mut sum: u32 = 0;
    {
        let _pause = arbiter.pause();
        for _ in 0..samples {
            let raw = adc.read(input);
            min = min.min(raw);
            max = max.max(raw);
            sum += u32::from(raw);
            delay.delay_us(spacing_us);
        }
    }

    Ok(RawCapture {
        channel: channel as u8,
        samples,
        offset: sampler.offset(channel),
        min,
        max,
        mean: sum as f32 / f32::from(samples),
    })
}

/// Switch each output on for `dwell_ms` then back to its recorded state,
/// Y0..Y15 then X0..X15.  Channels of locked modules are skipped.
/// Returns how many outputs were pulsed.
pub fn walk_outputs(
    outputs: &OutputTable,
    modules: &[Module; MODULE_COUNT],
    hw: &mut impl OutputPort,
    delay: &mut impl DelayNs,
    dwell_ms: u32,
) -> usize {
    let mut pulsed = 0;
    for idx in (0..OUTPUT_COUNT as u8).filter_map(OutputIndex::from_raw) {
        if idx.module().is_some_and(|m| modules[m].is_locked()) {
            continue;
        }
        hw.set_output(idx, true);
        delay.delay_ms(dwell_ms);
        hw.set_output(idx, outputs.is_on(idx));
        pulsed += 1;
    }
    log::info!("Output walk done: {pulsed}/{OUTPUT_COUNT} pulsed");
    pulsed
}
