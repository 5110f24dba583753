//! Interrupt-driven RMS current sampler.
//!
//! A 4 kHz timer calls [`CurrentSampler::on_timer_tick`], which visits one
//! sensored channel per tick in round-robin order, subtracts that channel's
//! zero-current offset from the raw reading and adds the square to the
//! channel's accumulator.  With 12 sensored channels sharing the clock,
//! each one collects 80 samples per 50 Hz period.
//!
//! The control loop calls [`CurrentSampler::finish_windows`] every 10 ms.
//! Channels that have reached the window size are copied out and reset in
//! one critical section under an ADC pause; the square root and scaling
//! happen afterwards, outside any lock.  Channels still short of a full
//! window keep accumulating and keep their previous RMS.

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use log::info;

use crate::app::ports::{AdcPort, AnalogInput, SamplerGate};
use crate::model::{CHANNEL_COUNT, Channel};
use crate::sensing::arbiter::AdcArbiter;

/// Interrupt-owned per-channel state.
struct SampleBank {
    sum_sq: [u32; CHANNEL_COUNT],
    count: [u16; CHANNEL_COUNT],
    offset: [u16; CHANNEL_COUNT],
    cursor: usize,
}

impl SampleBank {
    const fn new() -> Self {
        Self {
            sum_sq: [0; CHANNEL_COUNT],
            count: [0; CHANNEL_COUNT],
            offset: [0; CHANNEL_COUNT],
            cursor: 0,
        }
    }

    /// Next sensored channel at or after the cursor; advances past it.
    fn advance(&mut self, sensored: &[bool; CHANNEL_COUNT]) -> Option<usize> {
        for step in 0..CHANNEL_COUNT {
            let ch = (self.cursor + step) % CHANNEL_COUNT;
            if sensored[ch] {
                self.cursor = (ch + 1) % CHANNEL_COUNT;
                return Some(ch);
            }
        }
        None
    }

    fn accumulate(&mut self, ch: usize, raw: u16) {
        let diff = i32::from(raw) - i32::from(self.offset[ch]);
        let sq = diff.unsigned_abs().saturating_mul(diff.unsigned_abs());
        self.sum_sq[ch] = self.sum_sq[ch].saturating_add(sq);
        self.count[ch] = self.count[ch].saturating_add(1);
    }
}

pub struct CurrentSampler {
    sensored: [bool; CHANNEL_COUNT],
    bank: Mutex<RefCell<SampleBank>>,
}

impl CurrentSampler {
    pub const fn new(sensored: [bool; CHANNEL_COUNT]) -> Self {
        Self {
            sensored,
            bank: Mutex::new(RefCell::new(SampleBank::new())),
        }
    }

    pub fn has_sensor(&self, ch: usize) -> bool {
        self.sensored.get(ch).copied().unwrap_or(false)
    }

    pub fn sensor_map(&self) -> [bool; CHANNEL_COUNT] {
        self.sensored
    }

    /// Measure each sensored channel's zero-current offset.
    ///
    /// Must run with no load switched on.  Offsets are never recomputed.
    pub fn calibrate<G: SamplerGate>(
        &self,
        arbiter: &AdcArbiter<G>,
        adc: &mut impl AdcPort,
        delay: &mut impl DelayNs,
        samples: u16,
        spacing_us: u32,
    ) {
        let samples = samples.max(1);
        let _pause = arbiter.pause();
        for ch in (0..CHANNEL_COUNT).filter(|&ch| self.sensored[ch]) {
            let mut sum: u32 = 0;
            for _ in 0..samples {
                sum += u32::from(adc.read(AnalogInput::Current(ch as u8)));
                delay.delay_us(spacing_us);
            }
            let offset = (sum / u32::from(samples)) as u16;
            critical_section::with(|cs| {
                let mut bank = self.bank.borrow_ref_mut(cs);
                bank.offset[ch] = offset;
                bank.sum_sq[ch] = 0;
                bank.count[ch] = 0;
            });
            info!("Y{ch} offset = {offset}");
        }
    }

    /// One sampler tick.  Returns the channel sampled, if any.
    ///
    /// Interrupt context: never blocks, never allocates.
    pub fn on_timer_tick<G: SamplerGate>(
        &self,
        arbiter: &AdcArbiter<G>,
        adc: &mut impl AdcPort,
    ) -> Option<usize> {
        if arbiter.is_paused() {
            return None;
        }
        let ch = critical_section::with(|cs| self.bank.borrow_ref_mut(cs).advance(&self.sensored))?;
        let raw = adc.read(AnalogInput::Current(ch as u8));
        critical_section::with(|cs| self.bank.borrow_ref_mut(cs).accumulate(ch, raw));
        Some(ch)
    }

    /// Convert every full window into an RMS reading.  Returns how many
    /// channels were updated.
    pub fn finish_windows<G: SamplerGate>(
        &self,
        arbiter: &AdcArbiter<G>,
        channels: &mut [Channel; CHANNEL_COUNT],
        samples_per_window: u16,
        adc_to_amp: f32,
        noise_floor_amps: f32,
    ) -> usize {
        let windows = {
            let _pause = arbiter.pause();
            critical_section::with(|cs| {
                let mut bank = self.bank.borrow_ref_mut(cs);
                let mut windows = [None; CHANNEL_COUNT];
                for ch in 0..CHANNEL_COUNT {
                    if self.sensored[ch] && bank.count[ch] >= samples_per_window {
                        windows[ch] = Some((bank.sum_sq[ch], bank.count[ch]));
                        bank.sum_sq[ch] = 0;
                        bank.count[ch] = 0;
                    }
                }
                windows
            })
        };

        let mut finished = 0;
        for (channel, window) in channels.iter_mut().zip(windows) {
            if let Some((sum_sq, count)) = window {
                channel.rms_current_amps = rms_amps(sum_sq, count, adc_to_amp, noise_floor_amps);
                finished += 1;
            }
        }
        finished
    }

    pub fn offset(&self, ch: usize) -> u16 {
        critical_section::with(|cs| self.bank.borrow_ref(cs).offset[ch])
    }

    pub fn sample_count(&self, ch: usize) -> u16 {
        critical_section::with(|cs| self.bank.borrow_ref(cs).count[ch])
    }
}

/// √(Σx² / n) scaled to amps, with readings under the floor forced to 0.
pub fn rms_amps(sum_sq: u32, count: u16, adc_to_amp: f32, noise_floor_amps: f32) -> f32 {
    if count == 0 {
        return 0.0;
    }
    let rms_adc = (sum_sq as f32 / f32::from(count)).sqrt();
    let amps = rms_adc * adc_to_amp;
    if amps < noise_floor_amps { 0.0 } else { amps }
}
