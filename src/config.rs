//! System configuration parameters
//!
//! All tunable parameters for the power-distribution board.  Values are
//! compiled in; there is no persistent store, so energy totals restart from
//! zero on every boot.

use serde::{Deserialize, Serialize};

use crate::control::fan_level::FanThresholds;
use crate::error::{Error, Result};
use crate::sensing::thermistor::NtcParams;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Current sensing ---
    /// Highest ADC code (4095 for the 12-bit ESP32-S3 SAR ADC).
    pub adc_max_code: u16,
    /// ADC full-scale reference (volts).
    pub adc_ref_volts: f32,
    /// Current sensor sensitivity as seen at the ADC pin (V/A).
    /// ACS712-20A is 100 mV/A; the board's 2:3 divider makes it 66 mV/A.
    pub current_sensor_volts_per_amp: f32,
    /// Samples per channel that make one RMS window (one 50 Hz period).
    pub samples_per_window: u16,
    /// RMS readings below this are reported as exactly 0 A.
    pub noise_floor_amps: f32,
    /// Raw readings averaged per channel for the zero-current offset.
    pub calibration_samples: u16,
    /// Spacing between calibration readings (µs).
    pub calibration_spacing_us: u32,
    /// Sampler interrupt period (µs).
    pub sampler_period_us: u32,

    // --- Energy ---
    /// Nominal mains voltage used for P = I·V (not measured).
    pub line_voltage_v: f32,

    // --- Thermistors (NTC, Beta model) ---
    pub ntc_r0_ohms: f32,
    pub ntc_beta: f32,
    pub ntc_series_ohms: f32,

    // --- Fan / thermal protection (°C) ---
    pub fan_lvl1_in_c: f32,
    pub fan_lvl1_out_c: f32,
    /// Fan speed held while in the partial level (0-100%).
    pub fan_lvl1_speed_pct: u8,
    pub fan_lvl2_in_c: f32,
    pub fan_lvl2_out_c: f32,
    /// Hottest module at or above this is locked out.
    pub lockout_limit_c: f32,
    /// A locked module restores once it falls to `lockout_limit_c - restore_hysteresis_c`.
    pub restore_hysteresis_c: f32,
    /// Triac gate pulse width (µs).
    pub gate_pulse_us: u32,

    // --- Timing ---
    /// RMS window finishing interval (milliseconds)
    pub rms_interval_ms: u32,
    /// Power/energy integration interval (milliseconds)
    pub energy_interval_ms: u32,
    /// Thermal protection tick interval (milliseconds)
    pub thermal_interval_ms: u32,
    /// Telemetry report interval (seconds)
    pub telemetry_interval_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Current sensing
            adc_max_code: 4095,
            adc_ref_volts: 3.3,
            current_sensor_volts_per_amp: 0.066,
            samples_per_window: 80, // 4 kHz / 50 Hz
            noise_floor_amps: 0.5,
            calibration_samples: 200,
            calibration_spacing_us: 200,
            sampler_period_us: 250, // 4 kHz

            // Energy
            line_voltage_v: 230.0,

            // Thermistors: 10 kOhm @ 25 C, B = 3950, 10 kOhm divider
            ntc_r0_ohms: 10_000.0,
            ntc_beta: 3950.0,
            ntc_series_ohms: 10_000.0,

            // Fan / thermal
            fan_lvl1_in_c: 35.0,
            fan_lvl1_out_c: 32.0,
            fan_lvl1_speed_pct: 40,
            fan_lvl2_in_c: 55.0,
            fan_lvl2_out_c: 50.0,
            lockout_limit_c: 75.0,
            restore_hysteresis_c: 3.0,
            gate_pulse_us: 100,

            // Timing
            rms_interval_ms: 10,
            energy_interval_ms: 1000,
            thermal_interval_ms: 2000,
            telemetry_interval_secs: 30,
        }
    }
}

impl SystemConfig {
    /// Combined raw-ADC-count to amps scale: ref ÷ max code ÷ sensitivity.
    pub fn adc_to_amp(&self) -> f32 {
        self.adc_ref_volts / self.adc_max_code as f32 / self.current_sensor_volts_per_amp
    }

    /// Temperature at or below which a locked module is restored.
    pub fn restore_threshold_c(&self) -> f32 {
        self.lockout_limit_c - self.restore_hysteresis_c
    }

    pub fn fan_thresholds(&self) -> FanThresholds {
        FanThresholds {
            lvl1_in_c: self.fan_lvl1_in_c,
            lvl1_out_c: self.fan_lvl1_out_c,
            lvl2_in_c: self.fan_lvl2_in_c,
            lvl2_out_c: self.fan_lvl2_out_c,
        }
    }

    pub fn ntc_params(&self) -> NtcParams {
        NtcParams {
            r0_ohms: self.ntc_r0_ohms,
            beta: self.ntc_beta,
            series_ohms: self.ntc_series_ohms,
            adc_max: self.adc_max_code,
        }
    }

    /// Reject values that would break the hysteresis ladder or the sampler.
    ///
    /// Invalid ranges are rejected, never clamped: a silently clamped
    /// lockout limit is a disabled lockout.
    pub fn validate(&self) -> Result<()> {
        if !(self.fan_lvl1_out_c < self.fan_lvl1_in_c) {
            return Err(Error::Config("fan_lvl1_out_c must be below fan_lvl1_in_c"));
        }
        if !(self.fan_lvl1_in_c <= self.fan_lvl2_out_c) {
            return Err(Error::Config("fan_lvl2_out_c must not be below fan_lvl1_in_c"));
        }
        if !(self.fan_lvl2_out_c < self.fan_lvl2_in_c) {
            return Err(Error::Config("fan_lvl2_out_c must be below fan_lvl2_in_c"));
        }
        if !(self.fan_lvl2_in_c < self.lockout_limit_c) {
            return Err(Error::Config("lockout_limit_c must be above fan_lvl2_in_c"));
        }
        if !(self.restore_hysteresis_c > 0.0) {
            return Err(Error::Config("restore_hysteresis_c must be positive"));
        }
        if self.fan_lvl1_speed_pct > 100 {
            return Err(Error::Config("fan_lvl1_speed_pct must be 0-100"));
        }
        if self.samples_per_window == 0 || self.calibration_samples == 0 {
            return Err(Error::Config("sample counts must be non-zero"));
        }
        if self.adc_max_code == 0 || !(self.current_sensor_volts_per_amp > 0.0) {
            return Err(Error::Config("ADC scale must be positive"));
        }
        if self.rms_interval_ms == 0
            || self.energy_interval_ms == 0
            || self.thermal_interval_ms == 0
            || self.sampler_period_us == 0
        {
            return Err(Error::Config("intervals must be non-zero"));
        }
        Ok(())
    }
}
