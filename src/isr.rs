//! State shared between interrupt context and the control loop.
//!
//! | Static        | Written by                  | Read by                         |
//! |---------------|-----------------------------|---------------------------------|
//! | `SAMPLER`     | sampler tick (accumulators) | RMS finisher, under ADC pause   |
//! | `ZERO_CROSS`  | zero-cross GPIO ISR         | fan servicer                    |
//! | `ADC_ARBITER` | control loop only           | sampler tick (`is_paused`)      |
//!
//! Everything else lives in the [`BoardService`](crate::app::service::BoardService)
//! arenas and is never touched from interrupt context.

use crate::adapters::hardware::IsrAdc;
use crate::app::service::IsrShared;
use crate::drivers::fan::ZeroCrossLatch;
use crate::drivers::hw_timer::TimerGate;
use crate::pins;
use crate::sensing::arbiter::AdcArbiter;
use crate::sensing::current::CurrentSampler;

pub static SAMPLER: CurrentSampler = CurrentSampler::new(pins::current_sensor_map());
pub static ZERO_CROSS: ZeroCrossLatch = ZeroCrossLatch::new();
pub static ADC_ARBITER: AdcArbiter<TimerGate> = AdcArbiter::new(TimerGate::new());

/// Body of the 250 µs sampler timer callback.
pub fn sampler_tick() {
    SAMPLER.on_timer_tick(&ADC_ARBITER, &mut IsrAdc);
}

/// Borrow the statics for [`BoardService::new`](crate::app::service::BoardService::new).
pub fn shared() -> IsrShared<'static, TimerGate> {
    IsrShared {
        sampler: &SAMPLER,
        zero_cross: &ZERO_CROSS,
        arbiter: &ADC_ARBITER,
    }
}
