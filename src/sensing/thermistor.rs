//! NTC thermistor conversion (10 kOhm @ 25 C, B = 3950).
//!
//! Each module's NTC sits on the low side of a divider with a fixed
//! series resistor, so `R_ntc = R_series × adc / (max − adc)`.  The
//! simplified Beta equation converts resistance to temperature.  A code
//! at either rail has no finite resistance and is reported as a
//! [`SensorError`] instead of a temperature.

use crate::app::ports::{AdcPort, AnalogInput, SamplerGate};
use crate::error::SensorError;
use crate::model::MODULE_COUNT;
use crate::sensing::arbiter::AdcArbiter;

const T25_K: f32 = 298.15;
const KELVIN_OFFSET: f32 = 273.15;

#[derive(Debug, Clone, Copy)]
pub struct NtcParams {
    pub r0_ohms: f32,
    pub beta: f32,
    pub series_ohms: f32,
    pub adc_max: u16,
}

/// Raw ADC code → °C.
pub fn ntc_celsius(raw: u16, p: &NtcParams) -> Result<f32, SensorError> {
    if raw == 0 {
        return Err(SensorError::Shorted);
    }
    if raw >= p.adc_max {
        return Err(SensorError::Disconnected);
    }
    let raw = f32::from(raw);
    let r_ntc = p.series_ohms * raw / (f32::from(p.adc_max) - raw);
    let inv_t = 1.0 / T25_K + (r_ntc / p.r0_ohms).ln() / p.beta;
    Ok(1.0 / inv_t - KELVIN_OFFSET)
}

pub fn median_of_three(a: u16, b: u16, c: u16) -> u16 {
    a.max(b).min(a.min(b).max(c))
}

/// Reads the four module thermistors through the shared ADC.
pub struct ThermistorBank {
    params: NtcParams,
}

impl ThermistorBank {
    pub fn new(params: NtcParams) -> Self {
        Self { params }
    }

    /// Median of three back-to-back conversions, all under one ADC pause.
    pub fn read_module<G: SamplerGate>(
        &self,
        arbiter: &AdcArbiter<G>,
        adc: &mut impl AdcPort,
        module: usize,
    ) -> Result<f32, SensorError> {
        let input = AnalogInput::Thermistor(module as u8);
        let raw = {
            let _pause = arbiter.pause();
            let a = adc.read(input);
            let b = adc.read(input);
            let c = adc.read(input);
            median_of_three(a, b, c)
        };
        ntc_celsius(raw, &self.params)
    }

    pub fn read_all<G: SamplerGate>(
        &self,
        arbiter: &AdcArbiter<G>,
        adc: &mut impl AdcPort,
    ) -> [Result<f32, SensorError>; MODULE_COUNT] {
        core::array::from_fn(|m| self.read_module(arbiter, adc, m))
    }
}
