//! Per-batch snapshot of channel state
//!
//! The snapshot is filled while the channel table is locked and then read
//! by the mixing stage after the lock is released. It holds plain copies
//! only: nothing in here can reach back into the live table.

use std::cmp::Ordering;

use crate::error::{MixerError, Result};
use crate::fixed::Pan;

/// Volume trajectory of one channel across a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    /// Volume before the first sample of the batch
    pub start: i32,
    /// Per-sample delta while fading
    pub rate: i32,
    /// Volume the fade lands on
    pub target: i32,
    /// Samples from the batch start until the fade lands; zero means the
    /// volume is constant
    pub remaining: u32,
}

impl Envelope {
    pub const fn constant(volume: i32) -> Self {
        Self {
            start: volume,
            rate: 0,
            target: volume,
            remaining: 0,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.remaining == 0
    }

    /// Whether every sample of the batch is at zero volume
    pub fn is_silent(&self) -> bool {
        self.start == 0 && (self.remaining == 0 || self.target == 0)
    }

    /// Volume applied to the sample at `index` within the batch
    #[inline]
    pub fn volume_at(&self, index: usize) -> i32 {
        if self.remaining == 0 {
            return self.start;
        }
        let steps = index as u64 + 1;
        if steps >= u64::from(self.remaining) {
            self.target
        } else {
            Self::ramp(self.start, self.rate, self.target, steps as u32)
        }
    }

    /// `start + rate * steps`, never passing `target` in the direction of
    /// travel. Once `start` sits on the target it stays there.
    #[inline]
    pub fn ramp(start: i32, rate: i32, target: i32, steps: u32) -> i32 {
        let value = i64::from(start) + i64::from(rate) * i64::from(steps);
        let value = match rate.cmp(&0) {
            Ordering::Greater => value.min(i64::from(target).max(i64::from(start))),
            Ordering::Less => value.max(i64::from(target).min(i64::from(start))),
            Ordering::Equal => value,
        };
        value as i32
    }
}

/// Copy of one channel slot as seen by the mixing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelView {
    /// Decoded this batch and contributes to the mix
    pub active: bool,
    pub is_stereo: bool,
    pub envelope: Envelope,
    pub pan: Pan,
}

impl ChannelView {
    pub fn silent(is_stereo: bool, volume: i32, pan: Pan) -> Self {
        Self {
            active: false,
            is_stereo,
            envelope: Envelope::constant(volume),
            pan,
        }
    }

    /// Whether the mixing stage has anything to do for this channel
    pub fn is_audible(&self) -> bool {
        self.active && !self.envelope.is_silent()
    }
}

/// Read-only view of every channel for one batch
#[derive(Debug, Default)]
pub struct Snapshot {
    base_volume: i64,
    samples: usize,
    channels: Vec<ChannelView>,
}

impl Snapshot {
    /// Create a snapshot able to describe `num_channels` channels without
    /// reallocating
    pub fn with_capacity(num_channels: usize) -> Result<Self> {
        let mut channels = Vec::new();
        channels
            .try_reserve_exact(num_channels)
            .map_err(|_| MixerError::Allocation)?;
        Ok(Self {
            base_volume: 0,
            samples: 0,
            channels,
        })
    }

    /// Discard the previous batch and start describing a new one
    pub fn begin(&mut self, base_volume: i64, samples: usize) {
        self.base_volume = base_volume;
        self.samples = samples;
        self.channels.clear();
    }

    pub fn push(&mut self, view: ChannelView) {
        self.channels.push(view);
    }

    pub fn base_volume(&self) -> i64 {
        self.base_volume
    }

    /// Samples in this batch
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn channels(&self) -> &[ChannelView] {
        &self.channels
    }
}
