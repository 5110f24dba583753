//! Outbound application events.
//!
//! The [`BoardService`](super::service::BoardService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, publish over MQTT, etc.

use serde::Serialize;

use crate::control::fan_level::FanLevel;
use crate::error::SensorError;
use crate::model::{CHANNEL_COUNT, MODULE_COUNT};

/// Free-text notification body.
pub type Message = heapless::String<64>;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Calibration finished and the control loop is live.
    Started,

    /// Module locked out (`closed = true`) or restored (`closed = false`).
    ThermalAlert {
        module: u8,
        temperature_c: f32,
        closed: bool,
    },

    /// Human-readable notice (command rejection, sensor recovery).
    Notification {
        title: &'static str,
        message: Message,
    },

    FanLevelChanged { from: FanLevel, to: FanLevel },

    /// A module thermistor started reading at a rail.
    SensorFault { module: u8, error: SensorError },

    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),
}

impl AppEvent {
    /// Build a [`AppEvent::Notification`]; text past 64 bytes is dropped.
    pub fn notification(title: &'static str, args: core::fmt::Arguments<'_>) -> Self {
        let mut message = Message::new();
        let _ = core::fmt::write(&mut message, args);
        Self::Notification { title, message }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ChannelMetrics {
    pub amps: f32,
    pub watts: f32,
    pub wh: f32,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ModuleStatus {
    /// Effective temperature; `None` while faulted and not overridden.
    pub temperature_c: Option<f32>,
    pub overridden: bool,
    pub locked: bool,
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryData {
    pub uptime_ms: u32,
    pub fan_level: FanLevel,
    pub fan_speed_pct: u8,
    pub modules: [ModuleStatus; MODULE_COUNT],
    pub channels: [ChannelMetrics; CHANNEL_COUNT],
    /// Bit n = output n is on (Y0..Y15, X0..X15).
    pub outputs: u32,
}
