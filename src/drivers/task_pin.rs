//! Core-pinned helper threads.
//!
//! ESP-IDF backs `std::thread` with pthreads on FreeRTOS tasks, and
//! `esp_pthread_set_cfg()` sets the core, priority and stack for the
//! *next* thread the calling thread creates.  Configure-then-spawn must
//! therefore stay together on one thread.
//!
//! The control loop and the sampler's `esp_timer` task own CPU0.  Helper
//! threads such as the console reader go to CPU1 so a blocking read never
//! competes with them.

use std::thread::JoinHandle;

use log::info;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// CPU0: control loop and sampler timer.
    Pro = 0,
    /// CPU1: helper threads.
    App = 1,
}

/// Spawn `f` pinned to `core`.  `name` must be NUL-terminated
/// (e.g. `"console\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>, Error> {
    use esp_idf_svc::sys::{ESP_OK, esp_create_default_pthread_config, esp_pthread_set_cfg};

    // SAFETY: `name` is 'static and NUL-terminated; the config is consumed
    // by the spawn below on this same thread.
    let ret = unsafe {
        let mut cfg = esp_create_default_pthread_config();
        cfg.pin_to_core = core as i32;
        cfg.prio = i32::from(priority);
        cfg.stack_size = (stack_kb * 1024) as _;
        cfg.thread_name = name.as_ptr().cast();
        esp_pthread_set_cfg(&cfg)
    };
    if ret != ESP_OK as i32 {
        return Err(Error::Init("esp_pthread_set_cfg failed"));
    }

    let display_name = name.trim_end_matches('\0');
    info!("Spawning '{display_name}' on {core:?} (pri={priority}, stack={stack_kb}KB)");
    std::thread::Builder::new()
        .name(display_name.into())
        .spawn(f)
        .map_err(|_| Error::Init("thread spawn failed"))
}

/// Host build: no pinning, only the stack size is honoured.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>, Error> {
    let display_name = name.trim_end_matches('\0');
    info!("Spawning '{display_name}' (sim, {core:?} ignored, stack={stack_kb}KB)");
    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|_| Error::Init("thread spawn failed"))
}
