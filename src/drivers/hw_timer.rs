//! Current-sampler timer using ESP-IDF's esp_timer API.
//!
//! One 250 µs periodic timer drives [`crate::isr::sampler_tick`].  The
//! callback is dispatched from the esp_timer task, which sdkconfig pins to
//! the same core as the main task and which outranks it.  Stopping the
//! timer from the main task therefore cannot race a half-finished
//! callback: if one were running, the main task would not be.
//!
//! [`TimerGate`] is the [`SamplerGate`] the ADC arbiter drives.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::app::ports::SamplerGate;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
static mut SAMPLER_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: SAMPLER_TIMER is written once in `create_sampler_timer()` before
/// the gate is ever enabled.  Only the main task calls this.
#[cfg(target_os = "espidf")]
unsafe fn sampler_timer() -> esp_timer_handle_t {
    unsafe { SAMPLER_TIMER }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn sampler_tick_cb(_arg: *mut core::ffi::c_void) {
    crate::isr::sampler_tick();
}

/// Create the (stopped) sampler timer.
#[cfg(target_os = "espidf")]
pub fn create_sampler_timer() -> Result<(), i32> {
    // SAFETY: SAMPLER_TIMER is written here once at boot from the main task
    // before the timer is started.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(sampler_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"sampler".as_ptr(),
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, &raw mut SAMPLER_TIMER);
        if ret != ESP_OK {
            return Err(ret);
        }
    }
    info!("hw_timer: sampler timer created");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn create_sampler_timer() -> Result<(), i32> {
    log::info!("hw_timer(sim): sampler ticks are driven by the caller");
    Ok(())
}

// ── Gate ──────────────────────────────────────────────────────

/// Starts and stops the sampler timer on behalf of the ADC arbiter.
///
/// Until [`TimerGate::start`] is called the gate is unarmed and `enable`
/// does nothing, so ADC pauses taken during calibration cannot start
/// sampling early.
pub struct TimerGate {
    armed: AtomicBool,
    running: AtomicBool,
    period_us: AtomicU32,
}

impl TimerGate {
    pub const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            running: AtomicBool::new(false),
            period_us: AtomicU32::new(250),
        }
    }

    /// Arm the gate and start sampling at `period_us`.  Call once, after
    /// calibration, with no ADC pause held.
    pub fn start(&self, period_us: u32) {
        self.period_us.store(period_us, Ordering::Relaxed);
        self.armed.store(true, Ordering::Release);
        self.enable();
    }

    fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Default for TimerGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl SamplerGate for TimerGate {
    fn disable(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            // SAFETY: sampler_timer() contract; stop on a stopped timer
            // returns ESP_ERR_INVALID_STATE, which is harmless.
            unsafe {
                esp_timer_stop(sampler_timer());
            }
        }
    }

    fn enable(&self) {
        if self.is_armed() && !self.running.swap(true, Ordering::AcqRel) {
            let period = u64::from(self.period_us.load(Ordering::Relaxed));
            // SAFETY: sampler_timer() contract.
            let ret = unsafe { esp_timer_start_periodic(sampler_timer(), period) };
            if ret != ESP_OK {
                log::error!("hw_timer: sampler start failed (rc={ret})");
                self.running.store(false, Ordering::Release);
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl SamplerGate for TimerGate {
    fn disable(&self) {
        self.running.store(false, Ordering::Release);
    }

    fn enable(&self) {
        if self.is_armed() {
            self.running.store(true, Ordering::Release);
        }
    }
}
