//! Uptime clock for the control loop.
//!
//! One monotonic microsecond counter feeds both time bases the loop needs:
//! the fan servicer compares it against the latched zero-cross timestamp,
//! and the cadences run on a wrapping millisecond view of it.  On target
//! the counter is `esp_timer_get_time()`, the same clock the zero-cross
//! ISR stamps edges with; host builds measure from construction.

pub struct UptimeClock {
    #[cfg(not(target_os = "espidf"))]
    origin: std::time::Instant,
}

impl Default for UptimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl UptimeClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            origin: std::time::Instant::now(),
        }
    }

    pub fn uptime_us(&self) -> u64 {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: reads the free-running esp_timer counter.
            let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
            us as u64
        }
        #[cfg(not(target_os = "espidf"))]
        {
            self.origin.elapsed().as_micros() as u64
        }
    }

    /// Wraps after ~49.7 days; consumers compare with `wrapping_sub`.
    pub fn uptime_ms(&self) -> u32 {
        (self.uptime_us() / 1000) as u32
    }
}
