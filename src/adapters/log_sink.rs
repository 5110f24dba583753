//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! An MQTT bridge would implement the same trait.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => match serde_json::to_string(t) {
                Ok(json) => info!("TELEM | {json}"),
                Err(e) => warn!("TELEM | encode failed: {e}"),
            },
            AppEvent::ThermalAlert {
                module,
                temperature_c,
                closed,
            } => {
                if *closed {
                    error!("ALERT | M{module} LOCKED at {temperature_c:.1}\u{00b0}C");
                } else {
                    info!("ALERT | M{module} restored at {temperature_c:.1}\u{00b0}C");
                }
            }
            AppEvent::Notification { title, message } => {
                info!("NOTE  | {title}: {message}");
            }
            AppEvent::FanLevelChanged { from, to } => {
                info!("FAN   | {from} -> {to}");
            }
            AppEvent::SensorFault { module, error } => {
                warn!("FAULT | M{module} {error}");
            }
            AppEvent::Started => {
                info!("START | control loop live");
            }
        }
    }
}
