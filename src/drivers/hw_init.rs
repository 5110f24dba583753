//! One-shot hardware peripheral initialization and raw pin helpers.
//!
//! Configures the ADC, the analog mux address lines, the shift-register
//! chain and the fan pins using raw ESP-IDF sys calls.  Called once from
//! `main()` before the sampler timer starts.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: real peripherals.
//! On host/test: the mux inputs read from injectable atomics and the
//! shift-register frame is captured for inspection.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={rc})"),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={rc})"),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={rc})"),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        match e {
            HwInitError::AdcInitFailed(_) => Self::Init("ADC"),
            HwInitError::GpioConfigFailed(_) => Self::Init("GPIO"),
            HwInitError::IsrInstallFailed(_) => Self::Init("GPIO ISR service"),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the sampler timer and ISRs
    // exist; single-threaded.
    unsafe {
        init_gpio_outputs()?;
        init_adc()?;
    }
    // All triacs off before the register outputs are enabled.
    shift_out(0);
    gpio_write(pins::SR_OE_GPIO, false);
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) behind the mux ──────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: written once in `init_adc()` before any reader exists.  Readers
/// (sampler callback, control loop) are serialised by the ADC arbiter.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), pins::MUX_SIG_ADC1_CHANNEL, &chan_cfg) };
    if ret != ESP_OK {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    info!("hw_init: ADC1 CH{} configured (mux SIG)", pins::MUX_SIG_ADC1_CHANNEL);
    Ok(())
}

/// Select mux input `input` (0..16) and take one conversion.
///
/// Caller must hold exclusive ADC access (sampler callback, or the
/// control loop under an `AdcPause`).
#[cfg(target_os = "espidf")]
pub fn adc_read_mux(input: u8) -> u16 {
    for (bit, &pin) in pins::MUX_SELECT_GPIOS.iter().enumerate() {
        gpio_write(pin, input & (1 << bit) != 0);
    }
    // SAFETY: busy-wait on the ROM delay; no shared state.
    unsafe { esp_rom_delay_us(pins::MUX_SETTLE_US) };

    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract: exclusive access guaranteed by the arbiter.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), pins::MUX_SIG_ADC1_CHANNEL, &mut raw) };
    if ret != ESP_OK {
        return 0;
    }
    raw.clamp(0, 4095) as u16
}

#[cfg(not(target_os = "espidf"))]
static SIM_ADC: [AtomicU16; 16] = [const { AtomicU16::new(2048) }; 16];

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc(input: u8, raw: u16) {
    SIM_ADC[usize::from(input) % 16].store(raw, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn adc_read_mux(input: u8) -> u16 {
    SIM_ADC[usize::from(input) % 16].load(Ordering::Relaxed)
}

// ── GPIO outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let mut output_pins = heapless::Vec::<i32, 10>::new();
    let _ = output_pins.extend_from_slice(&pins::MUX_SELECT_GPIOS);
    let _ = output_pins.extend_from_slice(&[
        pins::SR_DATA_GPIO,
        pins::SR_CLOCK_GPIO,
        pins::SR_LATCH_GPIO,
        pins::SR_OE_GPIO,
        pins::FAN_GATE_GPIO,
    ]);

    for &pin in &output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        // OE is active-low: keep the register outputs disabled for now.
        let idle = u32::from(pin == pins::SR_OE_GPIO);
        unsafe { gpio_set_level(pin, idle) };
    }

    let zc_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::ZERO_CROSS_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_POSEDGE,
    };
    let ret = unsafe { gpio_config(&zc_cfg) };
    if ret != ESP_OK {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    info!("hw_init: GPIO configured (mux, shift register, fan)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin.
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── Shift-register chain ──────────────────────────────────────

/// Clock a 32-bit output frame into the chain and latch it.  Bit n drives
/// output n (Y0..Y15 = bits 0..15, X0..X15 = bits 16..31); the MSB goes
/// out first so bit 0 ends up in the first register.
#[cfg(target_os = "espidf")]
pub fn shift_out(frame: u32) {
    gpio_write(pins::SR_LATCH_GPIO, false);
    for bit in (0..32).rev() {
        gpio_write(pins::SR_DATA_GPIO, frame & (1 << bit) != 0);
        gpio_write(pins::SR_CLOCK_GPIO, true);
        gpio_write(pins::SR_CLOCK_GPIO, false);
    }
    gpio_write(pins::SR_LATCH_GPIO, true);
}

#[cfg(not(target_os = "espidf"))]
static SIM_FRAME: AtomicU32 = AtomicU32::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn shift_out(frame: u32) {
    SIM_FRAME.store(frame, Ordering::Relaxed);
}

/// Last frame latched into the simulated chain.
#[cfg(not(target_os = "espidf"))]
pub fn sim_frame() -> u32 {
    SIM_FRAME.load(Ordering::Relaxed)
}

// ── GPIO ISR service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn zero_cross_isr(_arg: *mut core::ffi::c_void) {
    // SAFETY: esp_timer_get_time is an RTC counter read; safe in ISR context.
    let now_us = unsafe { esp_timer_get_time() } as u64;
    crate::isr::ZERO_CROSS.on_rising_edge(now_us);
}

/// Install the per-pin GPIO ISR service and attach the zero-cross handler.
/// Call after `init_peripherals()`.
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: ESP_ERR_INVALID_STATE means the service is already installed
    // (acceptable).  The handler only touches the zero-cross latch.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        let ret = gpio_isr_handler_add(pins::ZERO_CROSS_GPIO, Some(zero_cross_isr), core::ptr::null_mut());
        if ret != ESP_OK {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        gpio_intr_enable(pins::ZERO_CROSS_GPIO);
    }
    info!("hw_init: zero-cross ISR attached on GPIO{}", pins::ZERO_CROSS_GPIO);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
