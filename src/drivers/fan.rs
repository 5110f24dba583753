//! Phase-controlled cooling fan (triac + zero-cross detector).
//!
//! Two cooperating halves:
//!
//! - [`ZeroCrossLatch`]: written by the zero-cross GPIO interrupt.  Holds
//!   at most one pending edge timestamp; a new edge overwrites an
//!   unconsumed one.
//! - [`PhaseControlFan`]: serviced from the control loop.  Once the
//!   firing delay has elapsed since the latched edge it pulses the triac
//!   gate and consumes the edge.
//!
//! At `Full` the latch is disarmed and the gate is held high, so the
//! triac conducts for the whole cycle.  At `Off` and `Partial` the latch
//! is armed; `Off` simply never fires.
//!
//! The gate pulse is a bounded busy-wait (100 µs).  It is the only place
//! the control loop spins, and it is far shorter than a half-cycle.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::debug;

use crate::control::fan_level::FanLevel;

/// Half a 50 Hz mains cycle.
pub const HALF_CYCLE_US: u64 = 10_000;

/// Firing delay at 0 % speed (fires just before the next zero crossing).
const DELAY_AT_0_PCT_US: u32 = 9_800;
/// Firing delay at 100 % speed.
const DELAY_AT_100_PCT_US: u32 = 200;

/// Inverse linear speed → delay map over the half-cycle window.
pub fn firing_delay_us(speed_pct: u8) -> u32 {
    let pct = u32::from(speed_pct.min(100));
    DELAY_AT_0_PCT_US - (DELAY_AT_0_PCT_US - DELAY_AT_100_PCT_US) * pct / 100
}

// ── Zero-cross latch (ISR side) ────────────────────────────────

pub struct ZeroCrossLatch {
    armed: AtomicBool,
    pending: Mutex<Cell<Option<u64>>>,
}

impl ZeroCrossLatch {
    pub const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            pending: Mutex::new(Cell::new(None)),
        }
    }

    /// Called from the rising-edge interrupt.
    pub fn on_rising_edge(&self, now_us: u64) {
        if self.armed.load(Ordering::Acquire) {
            critical_section::with(|cs| self.pending.borrow(cs).set(Some(now_us)));
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// Stop latching edges and drop any pending one.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
        critical_section::with(|cs| self.pending.borrow(cs).set(None));
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn pending(&self) -> Option<u64> {
        critical_section::with(|cs| self.pending.borrow(cs).get())
    }

    /// Consume `edge` unless a newer edge has already replaced it.
    pub fn clear_if(&self, edge: u64) {
        critical_section::with(|cs| {
            let cell = self.pending.borrow(cs);
            if cell.get() == Some(edge) {
                cell.set(None);
            }
        });
    }
}

impl Default for ZeroCrossLatch {
    fn default() -> Self {
        Self::new()
    }
}

// ── Triac firing (control-loop side) ───────────────────────────

pub struct PhaseControlFan<P: OutputPin, D: DelayNs> {
    gate: P,
    delay: D,
    level: FanLevel,
    speed_pct: u8,
    firing_delay_us: u32,
    pulse_us: u32,
}

impl<P: OutputPin, D: DelayNs> PhaseControlFan<P, D> {
    pub fn new(gate: P, delay: D, pulse_us: u32) -> Self {
        Self {
            gate,
            delay,
            level: FanLevel::Off,
            speed_pct: 0,
            firing_delay_us: firing_delay_us(0),
            pulse_us,
        }
    }

    /// Clamp to 0..=100 and recompute the delay.  Does not change the level.
    pub fn set_speed(&mut self, pct: u8) {
        self.speed_pct = pct.min(100);
        self.firing_delay_us = firing_delay_us(self.speed_pct);
    }

    /// Switch drive mode for a new level.
    pub fn apply_level(&mut self, level: FanLevel, latch: &ZeroCrossLatch) {
        self.level = level;
        match level {
            FanLevel::Full => {
                latch.disarm();
                self.drive_gate(true);
            }
            FanLevel::Partial | FanLevel::Off => {
                self.drive_gate(false);
                latch.arm();
            }
        }
    }

    /// Fire the triac if a half-cycle is pending and its delay has
    /// elapsed.  Returns `true` when a pulse was emitted.
    pub fn service(&mut self, latch: &ZeroCrossLatch, now_us: u64) -> bool {
        if self.level != FanLevel::Partial {
            return false;
        }
        let Some(edge) = latch.pending() else {
            return false;
        };
        let elapsed = now_us.wrapping_sub(edge);
        if elapsed < u64::from(self.firing_delay_us) {
            return false;
        }
        if elapsed >= HALF_CYCLE_US {
            // Missed this half-cycle; firing now would land in the next one.
            latch.clear_if(edge);
            return false;
        }

        self.drive_gate(true);
        self.delay.delay_us(self.pulse_us);
        self.drive_gate(false);
        latch.clear_if(edge);
        true
    }

    fn drive_gate(&mut self, high: bool) {
        let res = if high {
            self.gate.set_high()
        } else {
            self.gate.set_low()
        };
        if let Err(e) = res {
            debug!("fan gate write failed: {e:?}");
        }
    }

    pub fn level(&self) -> FanLevel {
        self.level
    }

    pub fn speed_pct(&self) -> u8 {
        self.speed_pct
    }

    pub fn firing_delay(&self) -> u32 {
        self.firing_delay_us
    }
}
