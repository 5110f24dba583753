//! Board service: the hexagonal core.
//!
//! [`BoardService`] is the single top-level context object.  It owns the
//! channel, module and output arenas plus every control-loop component,
//! and borrows the interrupt-shared state ([`IsrShared`]).  All I/O flows
//! through port traits injected at call sites, making the entire service
//! testable with mock adapters.
//!
//! ```text
//!     AdcPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │         BoardService          │
//!  OutputPort ◀── │ sampler · energy · thermal ·  │
//!                 │ fan · outputs                 │
//!                 └──────────────────────────────┘
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::control::fan_level::FanLevel;
use crate::diagnostics::{self, RawCapture};
use crate::drivers::fan::{PhaseControlFan, ZeroCrossLatch};
use crate::error::{CommandError, Result};
use crate::model::{
    CHANNEL_COUNT, Channel, MODULE_COUNT, Module, OutputIndex, OutputTable, channel_table,
};
use crate::safety::ThermalSupervisor;
use crate::sensing::arbiter::AdcArbiter;
use crate::sensing::current::CurrentSampler;
use crate::sensing::energy::EnergyIntegrator;
use crate::sensing::thermistor::ThermistorBank;

use super::cadence::Cadence;
use super::commands::{AppCommand, ChannelCommand, OverrideAction, OverrideRequest};
use super::events::{AppEvent, ChannelMetrics, ModuleStatus, TelemetryData};
use super::ports::{AdcPort, EventSink, OutputPort, SamplerGate};

/// State shared with interrupt context.  On target these are `static`s.
pub struct IsrShared<'a, G: SamplerGate> {
    pub sampler: &'a CurrentSampler,
    pub zero_cross: &'a ZeroCrossLatch,
    pub arbiter: &'a AdcArbiter<G>,
}

// ───────────────────────────────────────────────────────────────
// BoardService
// ───────────────────────────────────────────────────────────────

pub struct BoardService<'a, G: SamplerGate, P: OutputPin, D: DelayNs> {
    config: SystemConfig,
    isr: IsrShared<'a, G>,

    channels: [Channel; CHANNEL_COUNT],
    modules: [Module; MODULE_COUNT],
    outputs: OutputTable,

    thermal: ThermalSupervisor,
    thermistors: ThermistorBank,
    energy: EnergyIntegrator,
    fan: PhaseControlFan<P, D>,

    rms_cadence: Cadence,
    energy_cadence: Cadence,
    thermal_cadence: Cadence,
    telemetry_cadence: Cadence,
}

impl<'a, G: SamplerGate, P: OutputPin, D: DelayNs> BoardService<'a, G, P, D> {
    /// Validate `config` and build the service.  Cadences start at `now_ms`.
    pub fn new(
        config: SystemConfig,
        isr: IsrShared<'a, G>,
        fan: PhaseControlFan<P, D>,
        now_ms: u32,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            channels: channel_table(&isr.sampler.sensor_map()),
            modules: [Module::default(); MODULE_COUNT],
            outputs: OutputTable::new(),
            thermal: ThermalSupervisor::new(&config),
            thermistors: ThermistorBank::new(config.ntc_params()),
            energy: EnergyIntegrator::new(config.line_voltage_v),
            fan,
            rms_cadence: Cadence::new(config.rms_interval_ms, now_ms),
            energy_cadence: Cadence::new(config.energy_interval_ms, now_ms),
            thermal_cadence: Cadence::new(config.thermal_interval_ms, now_ms),
            telemetry_cadence: Cadence::new(
                config.telemetry_interval_secs.saturating_mul(1000),
                now_ms,
            ),
            isr,
            config,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Measure every sensored channel's zero-current offset.  Run before
    /// the sampler timer starts, with all outputs off.
    pub fn calibrate(&mut self, adc: &mut impl AdcPort, delay: &mut impl DelayNs) {
        info!(
            "Calibrating current sensors ({} samples, {} us apart)",
            self.config.calibration_samples, self.config.calibration_spacing_us
        );
        self.isr.sampler.calibrate(
            self.isr.arbiter,
            adc,
            delay,
            self.config.calibration_samples,
            self.config.calibration_spacing_us,
        );
    }

    /// Put the fan in its idle mode and announce the service.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.apply_fan_level(FanLevel::Off);
        sink.emit(&AppEvent::Started);
        info!("BoardService started");
    }

    // ── Per-pass orchestration ────────────────────────────────

    /// One pass of the cooperative main loop.
    ///
    /// The `hw` parameter satisfies **both** [`AdcPort`] and
    /// [`OutputPort`]; this avoids a double mutable borrow while keeping
    /// the port boundary explicit.
    pub fn poll(
        &mut self,
        now_ms: u32,
        now_us: u64,
        hw: &mut (impl AdcPort + OutputPort),
        sink: &mut impl EventSink,
    ) {
        self.fan.service(self.isr.zero_cross, now_us);

        if self.rms_cadence.poll(now_ms).is_some() {
            self.isr.sampler.finish_windows(
                self.isr.arbiter,
                &mut self.channels,
                self.config.samples_per_window,
                self.config.adc_to_amp(),
                self.config.noise_floor_amps,
            );
        }

        if let Some(elapsed) = self.energy_cadence.poll(now_ms) {
            self.energy.integrate(&mut self.channels, elapsed);
        }

        if self.thermal_cadence.poll(now_ms).is_some() {
            self.thermal_tick(hw, sink);
        }

        if self.telemetry_cadence.poll(now_ms).is_some() {
            sink.emit(&AppEvent::Telemetry(self.build_telemetry(now_ms)));
        }
    }

    fn thermal_tick(&mut self, hw: &mut (impl AdcPort + OutputPort), sink: &mut impl EventSink) {
        self.thermal.apply_pending_overrides(&mut self.modules);
        let readings = self.thermistors.read_all(self.isr.arbiter, hw);
        let transition = self.thermal.evaluate(
            &readings,
            &mut self.modules,
            &mut self.outputs,
            hw,
            sink,
        );
        if let Some((_, to)) = transition {
            self.apply_fan_level(to);
        }
    }

    fn apply_fan_level(&mut self, level: FanLevel) {
        let speed = match level {
            FanLevel::Off => 0,
            FanLevel::Partial => self.config.fan_lvl1_speed_pct,
            FanLevel::Full => 100,
        };
        self.fan.set_speed(speed);
        self.fan.apply_level(level, self.isr.zero_cross);
    }

    // ── Commands ──────────────────────────────────────────────

    pub fn dispatch(
        &mut self,
        cmd: AppCommand,
        hw: &mut impl OutputPort,
        sink: &mut impl EventSink,
    ) -> core::result::Result<(), CommandError> {
        match cmd {
            AppCommand::SetChannel(c) => self.handle_command(c, hw, sink),
            AppCommand::OverrideTemperature(req) => self.request_override(req.module, req.action),
        }
    }

    /// Apply an external switch command.  ON requests for a channel of a
    /// locked module are refused with a notification; OFF is always
    /// honoured.
    pub fn handle_command(
        &mut self,
        cmd: ChannelCommand,
        hw: &mut impl OutputPort,
        sink: &mut impl EventSink,
    ) -> core::result::Result<(), CommandError> {
        let idx = OutputIndex::new(cmd.kind, cmd.number).ok_or(CommandError::InvalidChannel)?;

        if cmd.on {
            if let Some(m) = idx.module().filter(|&m| self.modules[m].is_locked()) {
                warn!("{idx} ON rejected: M{m} locked");
                sink.emit(&AppEvent::notification(
                    "Command rejected",
                    format_args!("{idx} stays OFF: module {m} over temperature"),
                ));
                return Err(CommandError::ModuleLocked { module: m as u8 });
            }
        }

        hw.set_output(idx, cmd.on);
        self.outputs.write(idx, cmd.on);
        debug!("{idx} -> {}", if cmd.on { "ON" } else { "OFF" });
        Ok(())
    }

    /// Queue a temperature override for the next thermal tick.
    pub fn request_override(
        &mut self,
        module: u8,
        action: OverrideAction,
    ) -> core::result::Result<(), CommandError> {
        self.thermal.request_override(OverrideRequest { module, action })
    }

    // ── Metrics / publication ─────────────────────────────────

    pub fn current_amps(&self, ch: usize) -> f32 {
        self.channels.get(ch).map_or(0.0, |c| c.rms_current_amps)
    }

    pub fn power_watts(&self, ch: usize) -> f32 {
        self.channels.get(ch).map_or(0.0, |c| c.power_watts)
    }

    pub fn energy_wh(&self, ch: usize) -> f32 {
        self.channels.get(ch).map_or(0.0, |c| c.energy_wh)
    }

    /// One changed output per call, for the publisher.
    pub fn next_dirty_output(&mut self) -> Option<(OutputIndex, bool)> {
        self.outputs.next_dirty()
    }

    pub fn build_telemetry(&self, now_ms: u32) -> TelemetryData {
        TelemetryData {
            uptime_ms: now_ms,
            fan_level: self.fan.level(),
            fan_speed_pct: self.fan.speed_pct(),
            modules: core::array::from_fn(|m| ModuleStatus {
                temperature_c: self.modules[m].effective_c(),
                overridden: self.modules[m].override_c.is_some(),
                locked: self.modules[m].is_locked(),
            }),
            channels: core::array::from_fn(|ch| ChannelMetrics {
                amps: self.channels[ch].rms_current_amps,
                watts: self.channels[ch].power_watts,
                wh: self.channels[ch].energy_wh,
            }),
            outputs: self.outputs.bits(),
        }
    }

    // ── Diagnostics ───────────────────────────────────────────

    /// Pulse every output in turn (see [`diagnostics::walk_outputs`]).
    pub fn run_output_walk(
        &self,
        hw: &mut impl OutputPort,
        delay: &mut impl DelayNs,
        dwell_ms: u32,
    ) -> usize {
        diagnostics::walk_outputs(&self.outputs, &self.modules, hw, delay, dwell_ms)
    }

    /// Raw sample capture from one current sensor.
    pub fn capture_raw(
        &self,
        adc: &mut impl AdcPort,
        delay: &mut impl DelayNs,
        channel: usize,
        samples: u16,
    ) -> core::result::Result<RawCapture, CommandError> {
        diagnostics::capture_raw(
            self.isr.sampler,
            self.isr.arbiter,
            adc,
            delay,
            channel,
            samples,
            diagnostics::CAPTURE_SPACING_US,
        )
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn channels(&self) -> &[Channel; CHANNEL_COUNT] {
        &self.channels
    }

    pub fn modules(&self) -> &[Module; MODULE_COUNT] {
        &self.modules
    }

    pub fn outputs(&self) -> &OutputTable {
        &self.outputs
    }

    pub fn fan_level(&self) -> FanLevel {
        self.fan.level()
    }

    pub fn fan_speed_pct(&self) -> u8 {
        self.fan.speed_pct()
    }
}
