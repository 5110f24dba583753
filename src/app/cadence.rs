//! Elapsed-time gate for the control loop's periodic duties.

/// Fires at most once per `interval_ms`, measured on a wrapping ms clock.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    interval_ms: u32,
    last_ms: u32,
}

impl Cadence {
    pub fn new(interval_ms: u32, now_ms: u32) -> Self {
        Self {
            interval_ms,
            last_ms: now_ms,
        }
    }

    /// `Some(elapsed)` when due; the next period starts now.
    pub fn poll(&mut self, now_ms: u32) -> Option<u32> {
        let elapsed = now_ms.wrapping_sub(self.last_ms);
        if elapsed < self.interval_ms {
            return None;
        }
        self.last_ms = now_ms;
        Some(elapsed)
    }
}
