//! GPIO / peripheral pin assignments for the power-distribution board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

use crate::model::{CHANNEL_COUNT, MODULE_COUNT};

// ---------------------------------------------------------------------------
// Analog front end: 16:1 mux (CD74HC4067) into ADC1
// ---------------------------------------------------------------------------

/// Mux common output.  ADC1 channel 0 (GPIO 1 on ESP32-S3).
pub const MUX_SIG_GPIO: i32 = 1;
pub const MUX_SIG_ADC1_CHANNEL: u32 = 0;
/// Mux address lines S0..S3 (S0 = LSB).
pub const MUX_SELECT_GPIOS: [i32; 4] = [4, 5, 6, 7];
/// Settling time after switching the mux address (µs).
pub const MUX_SETTLE_US: u32 = 2;

/// Mux input carrying each Y channel's current sensor.  Y3, Y7, Y11 and
/// Y15 have no sensor fitted.
pub const CURRENT_MUX_INPUT: [Option<u8>; CHANNEL_COUNT] = [
    Some(0),
    Some(1),
    Some(2),
    None,
    Some(3),
    Some(4),
    Some(5),
    None,
    Some(6),
    Some(7),
    Some(8),
    None,
    Some(9),
    Some(10),
    Some(11),
    None,
];

/// Mux input carrying each module's NTC divider.
pub const THERMISTOR_MUX_INPUT: [u8; MODULE_COUNT] = [12, 13, 14, 15];

/// Which Y channels have a current sensor fitted.
pub const fn current_sensor_map() -> [bool; CHANNEL_COUNT] {
    let mut map = [false; CHANNEL_COUNT];
    let mut ch = 0;
    while ch < CHANNEL_COUNT {
        map[ch] = CURRENT_MUX_INPUT[ch].is_some();
        ch += 1;
    }
    map
}

// ---------------------------------------------------------------------------
// Output bank: 4 × 74HC595, daisy-chained
// ---------------------------------------------------------------------------

/// Serial data into the first register.
pub const SR_DATA_GPIO: i32 = 11;
pub const SR_CLOCK_GPIO: i32 = 12;
/// Rising edge copies the shift stage to the outputs.
pub const SR_LATCH_GPIO: i32 = 13;
/// Output enable, active LOW.  Held HIGH until the first all-off frame is
/// latched so the triacs never see power-on garbage.
pub const SR_OE_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// Fan
// ---------------------------------------------------------------------------

/// MOC3021 opto-triac driver input.  HIGH = gate current.
pub const FAN_GATE_GPIO: i32 = 15;
/// H11AA1 zero-cross detector output.  Rising edge at each zero crossing.
pub const ZERO_CROSS_GPIO: i32 = 16;
