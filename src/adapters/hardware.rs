//! Hardware adapter: bridges the board peripherals to the domain ports.
//!
//! [`HardwareAdapter`] is the control loop's view (ADC through the mux,
//! outputs through the shift-register chain).  [`IsrAdc`] is the sampler
//! callback's view of the same ADC.  [`GpioLine`] exposes a raw GPIO as an
//! `embedded-hal` output pin for the fan driver.  On non-espidf targets
//! all three sit on the `hw_init` simulation stubs.

use core::convert::Infallible;

use crate::app::ports::{AdcPort, AnalogInput, OutputPort};
use crate::drivers::hw_init;
use crate::model::OutputIndex;
use crate::pins;

/// Mux input for an analog source.  `None` for a sensorless channel.
pub fn mux_input(input: AnalogInput) -> Option<u8> {
    match input {
        AnalogInput::Current(ch) => pins::CURRENT_MUX_INPUT.get(usize::from(ch)).copied().flatten(),
        AnalogInput::Thermistor(m) => pins::THERMISTOR_MUX_INPUT.get(usize::from(m)).copied(),
    }
}

fn read_mux(input: AnalogInput) -> u16 {
    mux_input(input).map_or(0, hw_init::adc_read_mux)
}

// ── Control-loop adapter ──────────────────────────────────────

/// Holds a shadow of the 32-bit output frame; every change re-latches the
/// whole chain.
pub struct HardwareAdapter {
    frame: u32,
}

impl HardwareAdapter {
    /// Latches an all-off frame.
    pub fn new() -> Self {
        hw_init::shift_out(0);
        Self { frame: 0 }
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }
}

impl Default for HardwareAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl AdcPort for HardwareAdapter {
    fn read(&mut self, input: AnalogInput) -> u16 {
        read_mux(input)
    }
}

impl OutputPort for HardwareAdapter {
    fn set_output(&mut self, index: OutputIndex, on: bool) {
        let bit = 1u32 << index.raw();
        let frame = if on { self.frame | bit } else { self.frame & !bit };
        if frame != self.frame {
            self.frame = frame;
            hw_init::shift_out(frame);
        }
    }
}

// ── Sampler-callback ADC ──────────────────────────────────────

/// Stateless ADC handle for the sampler callback.
pub struct IsrAdc;

impl AdcPort for IsrAdc {
    fn read(&mut self, input: AnalogInput) -> u16 {
        read_mux(input)
    }
}

// ── Raw GPIO as an embedded-hal pin ───────────────────────────

pub struct GpioLine {
    pin: i32,
}

impl GpioLine {
    /// `pin` must already be configured as an output by `hw_init`.
    pub fn new(pin: i32) -> Self {
        Self { pin }
    }
}

impl embedded_hal::digital::ErrorType for GpioLine {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for GpioLine {
    fn set_low(&mut self) -> Result<(), Infallible> {
        hw_init::gpio_write(self.pin, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        hw_init::gpio_write(self.pin, true);
        Ok(())
    }
}
