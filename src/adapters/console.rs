//! Serial console command parser.
//!
//! One command per line, case-insensitive, whitespace separated:
//!
//! ```text
//! Y3 ON | X10 OFF | Y3 1 | X10 0   switch an output
//! T2 80.5 | T2 CLR                 override / clear module 2 temperature
//! CAP 5                            raw capture of Y5's current sensor
//! WALK                             output walk test
//! STATUS                           telemetry snapshot now
//! ```
//!
//! The reader thread parses each line and hands the result to the control
//! loop through [`CONSOLE_CHANNEL`], a fixed-depth queue.  While the loop is
//! busy in a capture or a walk, lines beyond the queue depth are dropped
//! and logged instead of piling up.
//!
//! ```text
//! ┌──────────────┐ ConsoleCommand ┌──────────────┐
//! │ console task │───────────────▶│ control loop │
//! │ (stdin)      │  depth 8       │ try_receive  │
//! └──────────────┘                └──────────────┘
//! ```

use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::commands::{AppCommand, ChannelCommand, OverrideAction, OverrideRequest};
use crate::model::{CHANNEL_COUNT, ChannelKind, MODULE_COUNT};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleCommand {
    App(AppCommand),
    Capture { channel: u8 },
    Walk,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    UnknownCommand,
    MissingArgument,
    BadArgument,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty line"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::MissingArgument => write!(f, "missing argument"),
            Self::BadArgument => write!(f, "bad argument"),
        }
    }
}

pub fn parse_line(line: &str) -> Result<ConsoleCommand, ParseError> {
    let mut words = line.split_whitespace();
    let head = words.next().ok_or(ParseError::Empty)?;
    let arg = words.next();
    if words.next().is_some() {
        return Err(ParseError::BadArgument);
    }

    if head.eq_ignore_ascii_case("WALK") {
        return Ok(ConsoleCommand::Walk);
    }
    if head.eq_ignore_ascii_case("STATUS") {
        return Ok(ConsoleCommand::Status);
    }
    if head.eq_ignore_ascii_case("CAP") {
        let channel = parse_index(arg.ok_or(ParseError::MissingArgument)?, CHANNEL_COUNT)?;
        return Ok(ConsoleCommand::Capture { channel });
    }

    let (prefix, rest) = head.split_at_checked(1).ok_or(ParseError::UnknownCommand)?;
    let arg = arg.ok_or(ParseError::MissingArgument)?;
    match prefix.to_ascii_uppercase().as_str() {
        "Y" | "X" => {
            let kind = if prefix.eq_ignore_ascii_case("Y") {
                ChannelKind::Y
            } else {
                ChannelKind::X
            };
            let number = parse_index(rest, CHANNEL_COUNT)?;
            let on = parse_switch(arg)?;
            Ok(ConsoleCommand::App(AppCommand::SetChannel(ChannelCommand {
                kind,
                number,
                on,
            })))
        }
        "T" => {
            let module = parse_index(rest, MODULE_COUNT)?;
            let action = if arg.eq_ignore_ascii_case("CLR") {
                OverrideAction::Clear
            } else {
                let t: f32 = arg.parse().map_err(|_| ParseError::BadArgument)?;
                if !t.is_finite() {
                    return Err(ParseError::BadArgument);
                }
                OverrideAction::Set(t)
            };
            Ok(ConsoleCommand::App(AppCommand::OverrideTemperature(
                OverrideRequest { module, action },
            )))
        }
        _ => Err(ParseError::UnknownCommand),
    }
}

fn parse_index(s: &str, limit: usize) -> Result<u8, ParseError> {
    let n: u8 = s.parse().map_err(|_| ParseError::BadArgument)?;
    if usize::from(n) < limit {
        Ok(n)
    } else {
        Err(ParseError::BadArgument)
    }
}

fn parse_switch(s: &str) -> Result<bool, ParseError> {
    if s == "1" || s.eq_ignore_ascii_case("ON") {
        Ok(true)
    } else if s == "0" || s.eq_ignore_ascii_case("OFF") {
        Ok(false)
    } else {
        Err(ParseError::BadArgument)
    }
}

// ── Command queue ─────────────────────────────────────────────

/// Lines accepted while the control loop is away.
pub const CONSOLE_DEPTH: usize = 8;

pub type ConsoleChannel = Channel<CriticalSectionRawMutex, ConsoleCommand, CONSOLE_DEPTH>;

/// Console task → control loop.
pub static CONSOLE_CHANNEL: ConsoleChannel = Channel::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    Queued,
    /// Blank line.
    Ignored,
    Rejected(ParseError),
    /// Queue full; the command was dropped.
    Dropped,
}

/// Parse one console line and queue the command without blocking.
pub fn submit_line(channel: &ConsoleChannel, line: &str) -> Submitted {
    match parse_line(line) {
        Ok(cmd) => match channel.try_send(cmd) {
            Ok(()) => Submitted::Queued,
            Err(_) => {
                warn!("console: queue full, dropped '{}'", line.trim());
                Submitted::Dropped
            }
        },
        Err(ParseError::Empty) => Submitted::Ignored,
        Err(e) => {
            warn!("console: '{}': {}", line.trim(), e);
            Submitted::Rejected(e)
        }
    }
}
