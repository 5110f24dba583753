//! Thermal protection supervisor.
//!
//! Runs once per thermal tick (every 2 s) after the four module
//! thermistors have been read.  It owns the fan level and drives the
//! per-module lockout.
//!
//! ## Tick sequence
//!
//! 1. Apply any queued operator overrides.
//! 2. Record the new readings.  A reading at an ADC rail marks the module
//!    faulted; it contributes nothing until it recovers.
//! 3. `Tmax` = hottest effective temperature (override, else measured).
//! 4. Step the fan hysteresis once.
//! 5. Lock the hottest module if `Tmax ≥ lockout_limit_c`: save which of
//!    its four channels were on, then switch those off.
//! 6. Restore *every* locked module whose own temperature has fallen to
//!    `lockout_limit_c − restore_hysteresis_c`, switching back on exactly
//!    the saved channels.
//!
//! If no module has a usable temperature the fan level is held and no
//! lockout is evaluated.

use log::{error, info, warn};

use crate::app::commands::{OverrideAction, OverrideRequest};
use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, OutputPort};
use crate::config::SystemConfig;
use crate::control::fan_level::{FanLevel, FanThresholds, next_level};
use crate::error::{CommandError, SensorError};
use crate::model::{CHANNELS_PER_MODULE, MODULE_COUNT, Module, OutputIndex, OutputTable};

pub type ModuleReadings = [Result<f32, SensorError>; MODULE_COUNT];

pub struct ThermalSupervisor {
    thresholds: FanThresholds,
    lockout_limit_c: f32,
    restore_threshold_c: f32,
    level: FanLevel,
    /// Latest unapplied override per module.
    pending: [Option<OverrideAction>; MODULE_COUNT],
    faults: [Option<SensorError>; MODULE_COUNT],
}

impl ThermalSupervisor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            thresholds: config.fan_thresholds(),
            lockout_limit_c: config.lockout_limit_c,
            restore_threshold_c: config.restore_threshold_c(),
            level: FanLevel::Off,
            pending: [None; MODULE_COUNT],
            faults: [None; MODULE_COUNT],
        }
    }

    pub fn level(&self) -> FanLevel {
        self.level
    }

    pub fn fault(&self, module: usize) -> Option<SensorError> {
        self.faults.get(module).copied().flatten()
    }

    /// Queue an override; a later request for the same module replaces it.
    pub fn request_override(&mut self, req: OverrideRequest) -> Result<(), CommandError> {
        let slot = self
            .pending
            .get_mut(usize::from(req.module))
            .ok_or(CommandError::InvalidModule)?;
        *slot = Some(req.action);
        Ok(())
    }

    pub fn apply_pending_overrides(&mut self, modules: &mut [Module; MODULE_COUNT]) {
        for (m, (slot, module)) in self.pending.iter_mut().zip(modules.iter_mut()).enumerate() {
            match slot.take() {
                Some(OverrideAction::Set(t)) => {
                    info!("M{m} temperature override -> {t:.1} C");
                    module.override_c = Some(t);
                }
                Some(OverrideAction::Clear) => {
                    info!("M{m} temperature override cleared");
                    module.override_c = None;
                }
                None => {}
            }
        }
    }

    /// One thermal tick after readings are in.  Returns the fan
    /// transition, if any, for the caller to apply to the fan driver.
    pub fn evaluate(
        &mut self,
        readings: &ModuleReadings,
        modules: &mut [Module; MODULE_COUNT],
        outputs: &mut OutputTable,
        hw: &mut impl OutputPort,
        sink: &mut impl EventSink,
    ) -> Option<(FanLevel, FanLevel)> {
        self.record_readings(readings, modules, sink);

        let (hottest, tmax) = hottest_module(modules)?;

        let from = self.level;
        let to = next_level(from, tmax, &self.thresholds);
        if to != from {
            info!("Fan {from} -> {to} (Tmax {tmax:.1} C, M{hottest})");
            self.level = to;
            sink.emit(&AppEvent::FanLevelChanged { from, to });
        }

        if tmax >= self.lockout_limit_c && !modules[hottest].is_locked() {
            lock_module(hottest, tmax, &mut modules[hottest], outputs, hw, sink);
        }

        for (m, module) in modules.iter_mut().enumerate() {
            if !module.is_locked() {
                continue;
            }
            if let Some(t) = module.effective_c() {
                if t <= self.restore_threshold_c {
                    restore_module(m, t, module, outputs, hw, sink);
                }
            }
        }

        (to != from).then_some((from, to))
    }

    fn record_readings(
        &mut self,
        readings: &ModuleReadings,
        modules: &mut [Module; MODULE_COUNT],
        sink: &mut impl EventSink,
    ) {
        for (m, reading) in readings.iter().enumerate() {
            match *reading {
                Ok(t) => {
                    modules[m].measured_c = Some(t);
                    if self.faults[m].take().is_some() {
                        info!("M{m} thermistor recovered ({t:.1} C)");
                        sink.emit(&AppEvent::notification(
                            "Sensor recovered",
                            format_args!("M{m} thermistor reads {t:.1} C"),
                        ));
                    }
                }
                Err(e) => {
                    modules[m].measured_c = None;
                    if self.faults[m] != Some(e) {
                        warn!("M{m}: {e}");
                        self.faults[m] = Some(e);
                        sink.emit(&AppEvent::SensorFault {
                            module: m as u8,
                            error: e,
                        });
                    }
                }
            }
        }
    }
}

/// Hottest usable module; the lowest index wins a tie.
fn hottest_module(modules: &[Module; MODULE_COUNT]) -> Option<(usize, f32)> {
    modules
        .iter()
        .enumerate()
        .filter_map(|(m, module)| module.effective_c().filter(|t| !t.is_nan()).map(|t| (m, t)))
        .fold(None, |best, (m, t)| match best {
            Some((_, bt)) if bt >= t => best,
            _ => Some((m, t)),
        })
}

fn lock_module(
    m: usize,
    temperature_c: f32,
    module: &mut Module,
    outputs: &mut OutputTable,
    hw: &mut impl OutputPort,
    sink: &mut impl EventSink,
) {
    let mask = outputs.module_mask(m);
    module.lock(mask);
    for slot in (0..CHANNELS_PER_MODULE).filter(|s| mask & (1 << s) != 0) {
        let idx = OutputIndex::in_module(m, slot);
        hw.set_output(idx, false);
        outputs.write(idx, false);
    }
    error!("M{m} LOCKED at {temperature_c:.1} C (saved mask {mask:04b})");
    sink.emit(&AppEvent::ThermalAlert {
        module: m as u8,
        temperature_c,
        closed: true,
    });
}

fn restore_module(
    m: usize,
    temperature_c: f32,
    module: &mut Module,
    outputs: &mut OutputTable,
    hw: &mut impl OutputPort,
    sink: &mut impl EventSink,
) {
    let mask = module.unlock();
    for slot in (0..CHANNELS_PER_MODULE).filter(|s| mask & (1 << s) != 0) {
        let idx = OutputIndex::in_module(m, slot);
        hw.set_output(idx, true);
        outputs.write(idx, true);
    }
    info!("M{m} restored at {temperature_c:.1} C (mask {mask:04b})");
    sink.emit(&AppEvent::ThermalAlert {
        module: m as u8,
        temperature_c,
        closed: false,
    });
}
