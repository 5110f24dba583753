//! Task watchdog (TWDT) for the control loop.
//!
//! A hung loop is the only fatal condition the firmware models, and a
//! restart is the only recovery.  The main task subscribes once and calls
//! [`Watchdog::feed`] on every pass.  Each feed also records the gap since
//! the previous one, so a pass creeping towards the timeout shows up in the
//! log long before the TWDT fires.

use log::{info, warn};

/// Matches `CONFIG_ESP_TASK_WDT_TIMEOUT_S` in sdkconfig.defaults.
pub const WATCHDOG_TIMEOUT_MS: u32 = 5_000;

pub struct Watchdog {
    timeout_ms: u32,
    subscribed: bool,
    last_feed_ms: Option<u32>,
    worst_gap_ms: u32,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(WATCHDOG_TIMEOUT_MS)
    }
}

impl Watchdog {
    /// Configure the TWDT and subscribe the calling task.
    pub fn new(timeout_ms: u32) -> Self {
        let subscribed = subscribe_current_task(timeout_ms);
        if subscribed {
            info!("Watchdog: {timeout_ms} ms, panic on trigger");
        }
        Self {
            timeout_ms,
            subscribed,
            last_feed_ms: None,
            worst_gap_ms: 0,
        }
    }

    /// Reset the TWDT and record the gap since the previous feed.
    pub fn feed(&mut self, now_ms: u32) {
        if self.subscribed {
            reset_current_task();
        }
        if let Some(last) = self.last_feed_ms {
            let gap = now_ms.wrapping_sub(last);
            if gap > self.worst_gap_ms {
                self.worst_gap_ms = gap;
                if gap > self.timeout_ms / 2 {
                    warn!("Watchdog: {gap} ms between feeds (timeout {} ms)", self.timeout_ms);
                }
            }
        }
        self.last_feed_ms = Some(now_ms);
    }

    /// Longest interval seen between two feeds.
    pub fn worst_gap_ms(&self) -> u32 {
        self.worst_gap_ms
    }
}

// ── ESP-IDF ───────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn subscribe_current_task(timeout_ms: u32) -> bool {
    use esp_idf_svc::sys::{ESP_OK, esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure};

    let cfg = esp_task_wdt_config_t {
        timeout_ms,
        idle_core_mask: 0,
        trigger_panic: true,
    };
    // SAFETY: called once from the main task during start-up; a null
    // handle subscribes the calling task.
    unsafe {
        let ret = esp_task_wdt_reconfigure(&cfg);
        if ret != ESP_OK {
            warn!("TWDT reconfigure returned {ret}, keeping the existing config");
        }
        let ret = esp_task_wdt_add(core::ptr::null_mut());
        if ret != ESP_OK {
            warn!("Watchdog: subscribe failed ({ret})");
        }
        ret == ESP_OK
    }
}

#[cfg(target_os = "espidf")]
fn reset_current_task() {
    // SAFETY: only resets the calling task's TWDT entry.
    unsafe {
        esp_idf_svc::sys::esp_task_wdt_reset();
    }
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
fn subscribe_current_task(timeout_ms: u32) -> bool {
    info!("Watchdog(sim): {timeout_ms} ms, no-op");
    false
}

#[cfg(not(target_os = "espidf"))]
fn reset_current_task() {}
