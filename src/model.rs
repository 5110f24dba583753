//! Board data model: fixed-size arenas for channels, modules and outputs.
//!
//! All three tables are owned by [`BoardService`](crate::app::service::BoardService)
//! and handed by reference to the components that need them.
//!
//! ## Ownership split for sensed channels
//!
//! A sensed channel's state is split across two owners:
//!
//! | Field                        | Owner                   | Lives in                         |
//! |------------------------------|-------------------------|----------------------------------|
//! | offset, Σx², sample count    | sampler interrupt       | [`CurrentSampler`] bank          |
//! | RMS, power, energy           | control loop            | [`Channel`]                      |
//!
//! The only crossing is `CurrentSampler::finish_windows`, which copies and
//! resets the interrupt-owned fields while the ADC arbiter holds the
//! sampler paused.
//!
//! [`CurrentSampler`]: crate::sensing::current::CurrentSampler

use core::fmt;

use serde::{Deserialize, Serialize};

/// Current-sensed (Y) channels.
pub const CHANNEL_COUNT: usize = 16;
/// Thermal modules, each grouping four consecutive Y channels.
pub const MODULE_COUNT: usize = 4;
pub const CHANNELS_PER_MODULE: usize = 4;
/// Y0..Y15 followed by X0..X15.
pub const OUTPUT_COUNT: usize = 32;

// ---------------------------------------------------------------------------
// Output addressing
// ---------------------------------------------------------------------------

/// Output bank.  `Y` is the high-power bank (current sensed, thermally
/// grouped); `X` is the low-power bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    Y,
    X,
}

/// Index into the 32-entry output table: Y0..Y15 → 0..15, X0..X15 → 16..31.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputIndex(u8);

impl OutputIndex {
    pub fn new(kind: ChannelKind, number: u8) -> Option<Self> {
        if number as usize >= CHANNEL_COUNT {
            return None;
        }
        Some(match kind {
            ChannelKind::Y => Self(number),
            ChannelKind::X => Self(CHANNEL_COUNT as u8 + number),
        })
    }

    pub fn from_raw(raw: u8) -> Option<Self> {
        (usize::from(raw) < OUTPUT_COUNT).then_some(Self(raw))
    }

    /// Output of the `slot`-th channel (0..4) in `module`.
    pub fn in_module(module: usize, slot: usize) -> Self {
        debug_assert!(module < MODULE_COUNT && slot < CHANNELS_PER_MODULE);
        Self((module * CHANNELS_PER_MODULE + slot) as u8)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub fn kind(self) -> ChannelKind {
        if usize::from(self.0) < CHANNEL_COUNT {
            ChannelKind::Y
        } else {
            ChannelKind::X
        }
    }

    pub fn number(self) -> u8 {
        self.0 % CHANNEL_COUNT as u8
    }

    /// Thermal module this output belongs to.  X outputs are not grouped.
    pub fn module(self) -> Option<usize> {
        match self.kind() {
            ChannelKind::Y => Some(usize::from(self.0) / CHANNELS_PER_MODULE),
            ChannelKind::X => None,
        }
    }
}

impl fmt::Display for OutputIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bank = match self.kind() {
            ChannelKind::Y => 'Y',
            ChannelKind::X => 'X',
        };
        write!(f, "{bank}{}", self.number())
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Control-loop view of one Y channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Channel {
    /// Static board fact; sensorless channels always read zero.
    pub has_sensor: bool,
    pub rms_current_amps: f32,
    pub power_watts: f32,
    /// Lifetime-since-boot total.  Never reset, never persisted.
    pub energy_wh: f32,
}

impl Channel {
    pub fn new(has_sensor: bool) -> Self {
        Self {
            has_sensor,
            ..Self::default()
        }
    }
}

/// Build the channel arena from the board's sensor map.
pub fn channel_table(sensor_map: &[bool; CHANNEL_COUNT]) -> [Channel; CHANNEL_COUNT] {
    core::array::from_fn(|i| Channel::new(sensor_map[i]))
}

// ---------------------------------------------------------------------------
// Module
// ---------------------------------------------------------------------------

/// One thermal module: four Y channels sharing a thermistor and a lockout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Module {
    locked: bool,
    /// Bit n set = channel n of this module was ON when the lock engaged.
    pre_lock_mask: u8,
    /// Last valid thermistor reading (°C); `None` while the sensor is faulted.
    pub measured_c: Option<f32>,
    /// Operator override; replaces `measured_c` until cleared.
    pub override_c: Option<f32>,
}

impl Module {
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn pre_lock_mask(&self) -> u8 {
        self.pre_lock_mask
    }

    /// Override if active, else the measured value.
    pub fn effective_c(&self) -> Option<f32> {
        self.override_c.or(self.measured_c)
    }

    /// Engage the lockout, recording which channels were on.
    pub fn lock(&mut self, mask: u8) {
        self.pre_lock_mask = mask & 0x0F;
        self.locked = true;
    }

    /// Release the lockout and hand back the saved mask.
    pub fn unlock(&mut self) -> u8 {
        let mask = self.pre_lock_mask;
        self.locked = false;
        self.pre_lock_mask = 0;
        mask
    }
}

// ---------------------------------------------------------------------------
// Output table
// ---------------------------------------------------------------------------

/// Authoritative on/off state for all 32 outputs, plus the per-output
/// "dirty" markers the communications side drains to publish state.
#[derive(Debug, Clone, Default)]
pub struct OutputTable {
    state: [bool; OUTPUT_COUNT],
    dirty: [bool; OUTPUT_COUNT],
}

impl OutputTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self, index: OutputIndex) -> bool {
        self.state[usize::from(index.raw())]
    }

    /// Record a new authoritative state and mark it for publication.
    pub fn write(&mut self, index: OutputIndex, on: bool) {
        let i = usize::from(index.raw());
        self.state[i] = on;
        self.dirty[i] = true;
    }

    /// 4-bit mask of which of `module`'s channels are on.
    pub fn module_mask(&self, module: usize) -> u8 {
        (0..CHANNELS_PER_MODULE).fold(0u8, |mask, slot| {
            if self.is_on(OutputIndex::in_module(module, slot)) {
                mask | (1 << slot)
            } else {
                mask
            }
        })
    }

    /// Take the lowest-numbered dirty output, clearing its marker.
    pub fn next_dirty(&mut self) -> Option<(OutputIndex, bool)> {
        let i = self.dirty.iter().position(|d| *d)?;
        self.dirty[i] = false;
        Some((OutputIndex(i as u8), self.state[i]))
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.iter().filter(|d| **d).count()
    }

    /// Bit n set = output n on.
    pub fn bits(&self) -> u32 {
        self.state
            .iter()
            .enumerate()
            .fold(0, |acc, (i, on)| if *on { acc | (1 << i) } else { acc })
    }
}
