//! Fan control: the level hysteresis and its phase-control mapping.

pub mod fan_level;
