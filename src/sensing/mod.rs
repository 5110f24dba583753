//! Analog sensing: the ADC arbiter, the interrupt-driven current sampler,
//! energy integration and thermistor conversion.
//!
//! Everything here is written against the [`AdcPort`](crate::app::ports::AdcPort)
//! and [`SamplerGate`](crate::app::ports::SamplerGate) ports and runs
//! unchanged on the host.

pub mod arbiter;
pub mod current;
pub mod energy;
pub mod thermistor;
