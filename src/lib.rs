//! Power-distribution board firmware library.
//!
//! Exposes the pure-logic modules for integration testing and host-side
//! simulation.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod safety;
pub mod sensing;

// Board-facing modules; the real implementations are cfg-gated inside and
// fall back to simulation stubs on the host.
pub mod adapters;
pub mod drivers;
pub mod isr;
pub mod pins;
