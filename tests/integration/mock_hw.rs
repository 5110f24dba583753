//! Mock board for integration tests.
//!
//! Serves scripted ADC codes and records every output write so tests can
//! assert on the full switching history without real GPIO or the
//! shift-register chain.

use core::cell::Cell;
use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use pdu::app::events::AppEvent;
use pdu::app::ports::{AdcPort, AnalogInput, EventSink, OutputPort, SamplerGate};
use pdu::app::service::{BoardService, IsrShared};
use pdu::config::SystemConfig;
use pdu::drivers::fan::{PhaseControlFan, ZeroCrossLatch};
use pdu::model::{CHANNEL_COUNT, MODULE_COUNT, OUTPUT_COUNT, OutputIndex};
use pdu::pins;
use pdu::sensing::arbiter::AdcArbiter;
use pdu::sensing::current::CurrentSampler;

/// Mid-scale: zero current on a sensor, ~25 °C on a thermistor.
pub const MID_SCALE: u16 = 2048;

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub current: [u16; CHANNEL_COUNT],
    pub thermistor: [u16; MODULE_COUNT],
    pub outputs: [bool; OUTPUT_COUNT],
    pub writes: Vec<(OutputIndex, bool)>,
    pub reads: usize,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            current: [MID_SCALE; CHANNEL_COUNT],
            thermistor: [MID_SCALE; MODULE_COUNT],
            outputs: [false; OUTPUT_COUNT],
            writes: Vec::new(),
            reads: 0,
        }
    }

    pub fn is_on(&self, idx: OutputIndex) -> bool {
        self.outputs[usize::from(idx.raw())]
    }

    pub fn module_on_mask(&self, module: usize) -> u8 {
        (0..4).fold(0, |mask, slot| {
            if self.is_on(OutputIndex::in_module(module, slot)) {
                mask | (1 << slot)
            } else {
                mask
            }
        })
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl AdcPort for MockHardware {
    fn read(&mut self, input: AnalogInput) -> u16 {
        self.reads += 1;
        match input {
            AnalogInput::Current(ch) => self.current[usize::from(ch)],
            AnalogInput::Thermistor(m) => self.thermistor[usize::from(m)],
        }
    }
}

impl OutputPort for MockHardware {
    fn set_output(&mut self, index: OutputIndex, on: bool) {
        self.outputs[usize::from(index.raw())] = on;
        self.writes.push((index, on));
    }
}

// ── Gate / pin / delay / sink ─────────────────────────────────

#[derive(Default)]
pub struct MockGate {
    enabled: Cell<bool>,
    pub disables: Cell<u32>,
}

#[allow(dead_code)]
impl MockGate {
    pub fn new() -> Self {
        Self {
            enabled: Cell::new(true),
            disables: Cell::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }
}

impl SamplerGate for MockGate {
    fn disable(&self) {
        self.enabled.set(false);
        self.disables.set(self.disables.get() + 1);
    }

    fn enable(&self) {
        self.enabled.set(true);
    }
}

#[derive(Default)]
pub struct MockPin {
    pub high: bool,
    pub rising_edges: u32,
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        if !self.high {
            self.rising_edges += 1;
        }
        self.high = true;
        Ok(())
    }
}

#[derive(Default)]
pub struct MockDelay {
    pub total_ns: u64,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thermal_alerts(&self) -> Vec<(u8, bool)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::ThermalAlert { module, closed, .. } => Some((*module, *closed)),
                _ => None,
            })
            .collect()
    }

    pub fn notifications(&self) -> Vec<&'static str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Notification { title, .. } => Some(*title),
                _ => None,
            })
            .collect()
    }

    pub fn telemetry_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::Telemetry(_)))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Board rig ─────────────────────────────────────────────────

/// Interrupt-shared state a test owns in place of the firmware statics.
pub struct IsrState {
    pub sampler: CurrentSampler,
    pub zero_cross: ZeroCrossLatch,
    pub arbiter: AdcArbiter<MockGate>,
}

#[allow(dead_code)]
impl IsrState {
    pub fn new() -> Self {
        Self {
            sampler: CurrentSampler::new(pins::current_sensor_map()),
            zero_cross: ZeroCrossLatch::new(),
            arbiter: AdcArbiter::new(MockGate::new()),
        }
    }

    pub fn shared(&self) -> IsrShared<'_, MockGate> {
        IsrShared {
            sampler: &self.sampler,
            zero_cross: &self.zero_cross,
            arbiter: &self.arbiter,
        }
    }

    /// Run `ticks` sampler interrupts against `adc`.
    pub fn run_sampler(&self, adc: &mut impl AdcPort, ticks: usize) {
        for _ in 0..ticks {
            self.sampler.on_timer_tick(&self.arbiter, adc);
        }
    }
}

pub type TestService<'a> = BoardService<'a, MockGate, MockPin, MockDelay>;

/// Calibrated (all offsets at mid-scale) and started service at t = 0.
#[allow(dead_code)]
pub fn started_service<'a>(
    isr: &'a IsrState,
    config: SystemConfig,
    hw: &mut MockHardware,
    sink: &mut RecordingSink,
) -> TestService<'a> {
    let fan = PhaseControlFan::new(MockPin::default(), MockDelay::default(), config.gate_pulse_us);
    let mut svc = BoardService::new(config, isr.shared(), fan, 0).expect("default config is valid");
    svc.calibrate(hw, &mut MockDelay::default());
    svc.start(sink);
    svc
}
