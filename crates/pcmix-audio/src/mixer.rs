//! Multi-channel PCM mixer
//!
//! The mixer owns a fixed table of channel slots behind a single mutex.
//! Control calls (volume, pan, fade, start/stop) lock the table briefly.
//! [`Mixer::get_pcm`] locks it once per batch to advance fades, run the
//! decode sources and copy the slots into a [`Snapshot`], then releases
//! it before the accumulate and quantize stages run on that copy.
//!
//! Channels are numbered from 1 to `num_channels`.

use parking_lot::Mutex;
use pcmix_core::{mixer_debug, mixer_trace, mixer_warn};

use crate::channel::{ChannelState, MixerChannel};
use crate::error::{MixerError, Result};
use crate::fixed::{self, Pan, MIX_ACCUM_BUFLEN};
use crate::mix;
use crate::snapshot::Snapshot;
use crate::source::DecodeSource;

/// Channel table shared between the control plane and the mixing thread
struct ChannelTable {
    channels: Vec<MixerChannel>,
    /// Base volume, `2^BASE_VOLUME_BITS` scale
    base_volume: i64,
}

/// Buffers private to the thread currently inside `get_pcm`
struct MixScratch {
    snapshot: Snapshot,
    /// Decode buffer per channel, one batch of stereo samples each
    pcm: Vec<Vec<i16>>,
    accum: Vec<i32>,
}

/// Software mixer combining independently decoded channels into one
/// interleaved 16-bit stereo stream
pub struct Mixer {
    table: Mutex<ChannelTable>,
    scratch: Mutex<MixScratch>,
    num_channels: u32,
    mix_rate: u32,
}

fn alloc_vec<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut vec = Vec::new();
    vec.try_reserve_exact(len)
        .map_err(|_| MixerError::Allocation)?;
    vec.resize(len, value);
    Ok(vec)
}

impl Mixer {
    /// Create a mixer with `num_channels` slots producing audio at
    /// `mix_rate` Hz. Nothing is kept if any allocation fails.
    pub fn new(num_channels: u32, mix_rate: u32) -> Result<Self> {
        if num_channels == 0 {
            mixer_warn!("Mixer init rejected: no channels requested");
            return Err(MixerError::InvalidParameter("num_channels must be at least 1"));
        }
        if mix_rate == 0 {
            mixer_warn!("Mixer init rejected: zero mix rate");
            return Err(MixerError::InvalidParameter("mix_rate must be nonzero"));
        }

        let count = num_channels as usize;
        let mut channels = Vec::new();
        channels
            .try_reserve_exact(count)
            .map_err(|_| MixerError::Allocation)?;
        channels.resize_with(count, MixerChannel::new);

        let mut pcm = Vec::new();
        pcm.try_reserve_exact(count)
            .map_err(|_| MixerError::Allocation)?;
        for _ in 0..count {
            pcm.push(alloc_vec(MIX_ACCUM_BUFLEN * 2, 0i16)?);
        }

        let scratch = MixScratch {
            snapshot: Snapshot::with_capacity(count)?,
            pcm,
            accum: alloc_vec(MIX_ACCUM_BUFLEN * 2, 0i32)?,
        };

        tracing::info!(
            "Mixer initialized with {} channels at {} Hz",
            num_channels,
            mix_rate
        );

        Ok(Self {
            table: Mutex::new(ChannelTable {
                channels,
                base_volume: fixed::base_volume_to_fixed(1.0),
            }),
            scratch: Mutex::new(scratch),
            num_channels,
            mix_rate,
        })
    }

    /// Number of channel slots
    pub fn num_channels(&self) -> u32 {
        self.num_channels
    }

    /// Output sample rate in Hz
    pub fn mix_rate(&self) -> u32 {
        self.mix_rate
    }

    /// Set the base (master) volume applied to every channel, clamped to
    /// `0.0..=15.0`
    pub fn set_base_volume(&self, volume: f32) {
        let fixed = fixed::base_volume_to_fixed(volume);
        self.table.lock().base_volume = fixed;
        mixer_debug!("Base volume set to {}", fixed::fixed_to_base_volume(fixed));
    }

    pub fn base_volume(&self) -> f32 {
        fixed::fixed_to_base_volume(self.table.lock().base_volume)
    }

    fn slot(&self, channel: u32) -> Result<usize> {
        if channel == 0 || channel > self.num_channels {
            mixer_warn!(
                "Invalid channel {} (valid range 1..={})",
                channel,
                self.num_channels
            );
            return Err(MixerError::InvalidChannel(channel));
        }
        Ok((channel - 1) as usize)
    }

    /// Run `f` on a validated channel slot with the table locked
    fn with_channel<T>(&self, channel: u32, f: impl FnOnce(&mut MixerChannel) -> T) -> Result<T> {
        let index = self.slot(channel)?;
        let mut table = self.table.lock();
        Ok(f(&mut table.channels[index]))
    }

    /// Attach a decode source to a free channel. Playback does not start
    /// until [`start`](Self::start); volume and pan keep their current
    /// values.
    pub fn assign<S>(&self, channel: u32, source: S, is_stereo: bool) -> Result<()>
    where
        S: DecodeSource + 'static,
    {
        self.assign_boxed(channel, Box::new(source), is_stereo)
    }

    /// [`assign`](Self::assign) for an already boxed source
    pub fn assign_boxed(
        &self,
        channel: u32,
        source: Box<dyn DecodeSource>,
        is_stereo: bool,
    ) -> Result<()> {
        let assigned = self.with_channel(channel, |ch| ch.assign(source, is_stereo).is_ok())?;
        if !assigned {
            mixer_warn!("Channel {} is already assigned", channel);
            return Err(MixerError::AlreadyAssigned(channel));
        }
        mixer_debug!(
            "Channel {} assigned ({})",
            channel,
            if is_stereo { "stereo" } else { "mono" }
        );
        Ok(())
    }

    /// Set a channel's linear volume (clamped to `0.0..=127.0`), cancelling
    /// any fade in progress
    pub fn set_volume(&self, channel: u32, volume: f32) -> Result<()> {
        let fixed = fixed::volume_to_fixed(volume);
        self.with_channel(channel, |ch| ch.set_volume(fixed))
    }

    /// Set a channel's stereo balance, `-1.0` (left) to `1.0` (right)
    pub fn set_pan(&self, channel: u32, pan: f32) -> Result<()> {
        let pan = Pan::from_balance(pan);
        self.with_channel(channel, |ch| ch.set_pan(pan))
    }

    /// Fade a channel linearly to `target` over `length` seconds. A zero
    /// length cancels any fade instead. With `cut` set, playback stops
    /// when the fade leaves the volume at zero.
    pub fn set_fade(&self, channel: u32, target: f32, length: f32, cut: bool) -> Result<()> {
        let target = fixed::volume_to_fixed(target);
        let span = fixed::fade_span(length, self.mix_rate);
        let zero_length = !(length > 0.0);

        let assigned = self.with_channel(channel, |ch| {
            if !ch.is_assigned() {
                return false;
            }
            if zero_length {
                ch.cancel_fade();
            } else {
                ch.set_fade(target, span, cut);
            }
            true
        })?;
        if !assigned {
            mixer_warn!("Cannot fade channel {}: nothing assigned", channel);
            return Err(MixerError::NotAssigned(channel));
        }
        mixer_trace!(
            "Channel {} fading to {} over {} samples",
            channel,
            fixed::fixed_to_volume(target),
            fixed::fade_samples(span)
        );
        Ok(())
    }

    /// Begin playing an assigned channel
    pub fn start(&self, channel: u32) -> Result<()> {
        if !self.with_channel(channel, MixerChannel::start)? {
            mixer_warn!("Cannot start channel {}: nothing assigned", channel);
            return Err(MixerError::NotAssigned(channel));
        }
        Ok(())
    }

    /// Pause a channel, keeping its source and parameters
    pub fn stop(&self, channel: u32) -> Result<()> {
        self.with_channel(channel, MixerChannel::stop)
    }

    /// Stop a channel and return it to the free state with default
    /// volume, pan and fade, releasing its decode source
    pub fn reset(&self, channel: u32) -> Result<()> {
        let released = self.with_channel(channel, |ch| {
            if !ch.is_assigned() {
                return None;
            }
            // The source is dropped after the lock is released
            Some(std::mem::take(ch))
        })?;
        if released.is_some() {
            mixer_debug!("Channel {} reset", channel);
        }
        Ok(())
    }

    /// Reset every channel
    pub fn reset_all(&self) {
        let released: Vec<MixerChannel> = {
            let mut table = self.table.lock();
            table.channels.iter_mut().map(std::mem::take).collect()
        };
        mixer_debug!(
            "Reset {} channels",
            released.iter().filter(|ch| ch.is_assigned()).count()
        );
    }

    /// Whether a channel is currently playing. Invalid channels report
    /// `false`.
    pub fn status(&self, channel: u32) -> bool {
        self.with_channel(channel, |ch| ch.is_playing())
            .unwrap_or(false)
    }

    pub fn state(&self, channel: u32) -> Option<ChannelState> {
        self.with_channel(channel, |ch| ch.state()).ok()
    }

    /// Current linear volume of a channel
    pub fn volume(&self, channel: u32) -> Option<f32> {
        self.with_channel(channel, |ch| fixed::fixed_to_volume(ch.volume()))
            .ok()
    }

    /// Current pan setting of a channel
    pub fn pan(&self, channel: u32) -> Option<Pan> {
        self.with_channel(channel, |ch| ch.pan()).ok()
    }

    pub fn is_fading(&self, channel: u32) -> Option<bool> {
        self.with_channel(channel, |ch| ch.is_fading()).ok()
    }

    /// Fill `output` with interleaved stereo samples (`output.len() / 2`
    /// samples; a trailing odd value is zeroed).
    ///
    /// Must not be called from two threads at once. A concurrent call is
    /// detected and gets silence.
    pub fn get_pcm(&self, output: &mut [i16]) {
        let Some(mut scratch) = self.scratch.try_lock() else {
            mixer_warn!("get_pcm re-entered concurrently; returning silence");
            output.fill(0);
            return;
        };
        let MixScratch {
            snapshot,
            pcm,
            accum,
        } = &mut *scratch;

        let frames = output.len() & !1;
        let (output, tail) = output.split_at_mut(frames);
        tail.fill(0);

        for batch in output.chunks_mut(MIX_ACCUM_BUFLEN * 2) {
            let samples = batch.len() / 2;
            self.prepare_batch(snapshot, pcm, samples);
            mix::accumulate(snapshot, pcm, accum);
            mix::quantize(&accum[..samples * 2], batch);
        }
    }

    /// Lock the table, run fades and decoders for one batch and copy the
    /// result into `snapshot`
    fn prepare_batch(&self, snapshot: &mut Snapshot, pcm: &mut [Vec<i16>], samples: usize) {
        let mut table = self.table.lock();
        snapshot.begin(table.base_volume, samples);
        for (index, (channel, pcm)) in table.channels.iter_mut().zip(pcm.iter_mut()).enumerate() {
            let view = channel.prepare_batch(index as u32 + 1, pcm, samples);
            snapshot.push(view);
        }
        mixer_trace!("Prepared batch of {} samples", samples);
    }
}

impl Drop for Mixer {
    fn drop(&mut self) {
        self.reset_all();
        tracing::info!("Mixer shut down");
    }
}
