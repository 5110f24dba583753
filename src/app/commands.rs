//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (MQTT bridge,
//! serial terminal) that the [`BoardService`](super::service::BoardService)
//! interprets and acts upon.

use serde::Deserialize;

use crate::model::ChannelKind;

/// Switch one output: `(Y|X, 0..=15, on)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ChannelCommand {
    pub kind: ChannelKind,
    pub number: u8,
    pub on: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverrideAction {
    /// Replace the module's thermistor reading with this value (°C).
    Set(f32),
    /// Return to the thermistor reading.
    Clear,
}

/// Operator temperature override for one module, applied at the start of
/// the next thermal tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverrideRequest {
    pub module: u8,
    pub action: OverrideAction,
}

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppCommand {
    SetChannel(ChannelCommand),
    OverrideTemperature(OverrideRequest),
}
