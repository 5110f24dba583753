//! Shared-ADC arbiter.
//!
//! The board has one ADC behind a 16:1 analog mux.  The sampler interrupt
//! owns it by default; anything in the control loop that needs a reading
//! (thermistors, calibration, raw capture, the RMS window hand-off) takes
//! an [`AdcPause`] guard first.  Pauses nest: the sampler is masked on the
//! 0→1 depth transition and unmasked on 1→0, and the guard makes the
//! release happen on every exit path.
//!
//! `pause` is only ever called from the control loop, never from
//! interrupt context, so the depth counter has a single writer.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::app::ports::SamplerGate;

pub struct AdcArbiter<G: SamplerGate> {
    gate: G,
    depth: AtomicU8,
}

impl<G: SamplerGate> AdcArbiter<G> {
    pub const fn new(gate: G) -> Self {
        Self {
            gate,
            depth: AtomicU8::new(0),
        }
    }

    /// Mask the sampler (if not already masked) until the guard drops.
    pub fn pause(&self) -> AdcPause<'_, G> {
        let prev = self.depth.fetch_add(1, Ordering::AcqRel);
        debug_assert!(prev < u8::MAX, "ADC pause nesting overflow");
        if prev == 0 {
            self.gate.disable();
        }
        AdcPause { arbiter: self }
    }

    fn resume(&self) {
        let prev = self.depth.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "unmatched ADC resume");
        if prev == 1 {
            self.gate.enable();
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> u8 {
        self.depth.load(Ordering::Acquire)
    }

    /// Checked by the sampler callback: a tick that lands while paused
    /// (timer stop racing an already-queued dispatch) must not touch the ADC.
    pub fn is_paused(&self) -> bool {
        self.depth() > 0
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }
}

/// Scope guard returned by [`AdcArbiter::pause`].
#[must_use = "the sampler resumes as soon as the guard is dropped"]
pub struct AdcPause<'a, G: SamplerGate> {
    arbiter: &'a AdcArbiter<G>,
}

impl<G: SamplerGate> Drop for AdcPause<'_, G> {
    fn drop(&mut self) {
        self.arbiter.resume();
    }
}
