//! Three-level fan hysteresis.
//!
//! ```text
//!        Tmax ≥ lvl1_in        Tmax ≥ lvl2_in
//!   Off ───────────────▶ Partial ───────────────▶ Full
//!       ◀─────────────── Partial ◀───────────────
//!        Tmax ≤ lvl1_out       Tmax ≤ lvl2_out
//! ```
//!
//! One step per evaluation: `Off` and `Full` are never adjacent.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FanLevel {
    #[default]
    Off,
    /// Phase-controlled at the level-1 speed.
    Partial,
    /// Triac held on continuously.
    Full,
}

impl core::fmt::Display for FanLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Off => write!(f, "OFF"),
            Self::Partial => write!(f, "PARTIAL"),
            Self::Full => write!(f, "FULL"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FanThresholds {
    pub lvl1_in_c: f32,
    pub lvl1_out_c: f32,
    pub lvl2_in_c: f32,
    pub lvl2_out_c: f32,
}

/// Level after observing `tmax`.  Returns `current` when inside a deadband.
pub fn next_level(current: FanLevel, tmax: f32, th: &FanThresholds) -> FanLevel {
    match current {
        FanLevel::Off if tmax >= th.lvl1_in_c => FanLevel::Partial,
        FanLevel::Partial if tmax >= th.lvl2_in_c => FanLevel::Full,
        FanLevel::Partial if tmax <= th.lvl1_out_c => FanLevel::Off,
        FanLevel::Full if tmax <= th.lvl2_out_c => FanLevel::Partial,
        level => level,
    }
}
