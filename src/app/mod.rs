//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the business rules for the power-distribution board:
//! command handling, periodic duty scheduling and telemetry.  All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod cadence;
pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
