//! Unified error types for the power-distribution firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform.  All variants are `Copy` so they
//! travel through the thermal supervisor and event sink without allocation.
//!
//! Note what is *not* here: a channel without a current sensor is a static
//! board fact and always reports zero, and ADC contention is prevented
//! structurally by the arbiter.  Neither is ever surfaced as an error.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A thermistor reading sat on an ADC rail.
    Sensor(SensorError),
    /// An external channel command was refused.
    Command(CommandError),
    /// Configuration is invalid.
    Config(&'static str),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

/// Invalid thermistor reading.  The thermal supervisor never treats one of
/// these as a temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SensorError {
    /// ADC at full scale: the NTC leg is open (unplugged probe).
    Disconnected,
    /// ADC at zero: the NTC leg is shorted to ground.
    Shorted,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "thermistor disconnected"),
            Self::Shorted => write!(f, "thermistor shorted"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Channel number outside 0..=15, or a channel with no sensor fitted
    /// where one is required.
    InvalidChannel,
    /// Module number outside 0..=3.
    InvalidModule,
    /// ON request for a channel whose module is thermally locked out.
    ModuleLocked { module: u8 },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChannel => write!(f, "invalid channel"),
            Self::InvalidModule => write!(f, "invalid module"),
            Self::ModuleLocked { module } => write!(f, "module {module} locked (over temperature)"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
