//! Port traits: the hexagonal boundary between domain logic and the board.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ BoardService (domain)
//! ```
//!
//! Driven adapters (ADC mux, shift-register outputs, sampler timer, event
//! sinks) implement these traits.  The
//! [`BoardService`](super::service::BoardService) consumes them via generics,
//! so the domain core never touches ESP-IDF directly and the whole control
//! path runs on the host under test.

use crate::model::OutputIndex;

// ───────────────────────────────────────────────────────────────
// ADC port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Analog sources multiplexed onto the single ADC input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogInput {
    /// Current sensor of Y channel `n` (0..16).  Only sensored channels
    /// are ever read.
    Current(u8),
    /// Thermistor of module `m` (0..4).
    Thermistor(u8),
}

/// Read-side port: one blocking ADC conversion.
///
/// The ADC is shared between the sampler interrupt and the control loop.
/// Callers in the control loop MUST hold an
/// [`AdcPause`](crate::sensing::arbiter::AdcPause) for the duration of
/// every read.
pub trait AdcPort {
    /// Raw code, `0..=adc_max_code`.
    fn read(&mut self, input: AnalogInput) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Output port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: drive one of the 32 switched outputs.
pub trait OutputPort {
    fn set_output(&mut self, index: OutputIndex, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Sampler gate (driven adapter: domain → timer interrupt)
// ───────────────────────────────────────────────────────────────

/// Enable/disable the periodic current-sampling interrupt.
///
/// Only the [`AdcArbiter`](crate::sensing::arbiter::AdcArbiter) calls
/// this.  `disable` must not return while a sampler callback is still
/// running.
pub trait SamplerGate {
    fn disable(&self);
    fn enable(&self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, MQTT
/// bridge, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
