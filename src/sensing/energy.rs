//! Power and energy integration from the latest RMS readings.
//!
//! Power is `I_rms × V_nominal`; the line voltage is configured, not
//! measured, so this is apparent power at nominal voltage.  Energy totals
//! are lifetime-since-boot and only ever grow.

use crate::model::Channel;

const MS_PER_HOUR: f32 = 3_600_000.0;

#[derive(Debug, Clone, Copy)]
pub struct EnergyIntegrator {
    line_voltage_v: f32,
}

impl EnergyIntegrator {
    pub fn new(line_voltage_v: f32) -> Self {
        Self { line_voltage_v }
    }

    /// Refresh every channel's power and add `power × elapsed` to its total.
    pub fn integrate(&self, channels: &mut [Channel], elapsed_ms: u32) {
        let hours = elapsed_ms as f32 / MS_PER_HOUR;
        for ch in channels.iter_mut() {
            if !ch.has_sensor {
                ch.power_watts = 0.0;
                continue;
            }
            ch.power_watts = ch.rms_current_amps * self.line_voltage_v;
            if ch.power_watts > 0.0 {
                ch.energy_wh += ch.power_watts * hours;
            }
        }
    }
}
