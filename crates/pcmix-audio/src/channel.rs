//! Mixer channel slots

use std::fmt;

use crate::fixed::{self, Pan, VOLUME_ONE};
use crate::snapshot::{ChannelView, Envelope};
use crate::source::DecodeSource;

/// Lifecycle state of a channel slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No decode source assigned
    Free,
    /// Source assigned but not sounding
    Assigned,
    /// Source assigned and being mixed
    Playing,
}

/// One playback slot of the mixer.
///
/// Slots live inside the mixer's locked channel table; every field here is
/// only touched with that lock held.
pub struct MixerChannel {
    source: Option<Box<dyn DecodeSource>>,
    is_stereo: bool,
    is_playing: bool,
    /// Current volume, `2^VOLUME_BITS` scale
    volume: i32,
    /// Per-sample volume delta while fading
    fade_rate: i32,
    fade_target: i32,
    /// Samples until the fade lands on `fade_target`; zero when not fading
    fade_remaining: u32,
    /// Stop playback once a fade leaves the volume at zero
    fade_cut: bool,
    pan: Pan,
}

impl MixerChannel {
    pub fn new() -> Self {
        Self {
            source: None,
            is_stereo: false,
            is_playing: false,
            volume: VOLUME_ONE,
            fade_rate: 0,
            fade_target: 0,
            fade_remaining: 0,
            fade_cut: false,
            pan: Pan::CENTER,
        }
    }

    pub fn state(&self) -> ChannelState {
        match (&self.source, self.is_playing) {
            (None, _) => ChannelState::Free,
            (Some(_), false) => ChannelState::Assigned,
            (Some(_), true) => ChannelState::Playing,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.source.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_stereo(&self) -> bool {
        self.is_stereo
    }

    pub fn is_fading(&self) -> bool {
        self.fade_remaining > 0
    }

    pub fn volume(&self) -> i32 {
        self.volume
    }

    pub fn pan(&self) -> Pan {
        self.pan
    }

    /// Attach a decode source; hands it back if the slot is occupied
    pub fn assign(
        &mut self,
        source: Box<dyn DecodeSource>,
        is_stereo: bool,
    ) -> Result<(), Box<dyn DecodeSource>> {
        if self.source.is_some() {
            return Err(source);
        }
        self.source = Some(source);
        self.is_stereo = is_stereo;
        self.is_playing = false;
        Ok(())
    }

    /// Set the volume immediately, cancelling any fade
    pub fn set_volume(&mut self, volume: i32) {
        self.volume = volume;
        self.cancel_fade();
    }

    pub fn set_pan(&mut self, pan: Pan) {
        self.pan = pan;
    }

    /// Ramp linearly to `target` over `span` samples. The volume lands on
    /// the target once `span` rounded to whole samples has been mixed.
    pub fn set_fade(&mut self, target: i32, span: f64, cut: bool) {
        self.fade_rate = fixed::fade_rate(self.volume, target, span);
        self.fade_target = target;
        self.fade_remaining = fixed::fade_samples(span);
        self.fade_cut = cut;
    }

    pub fn cancel_fade(&mut self) {
        self.fade_rate = 0;
        self.fade_remaining = 0;
        self.fade_cut = false;
    }

    /// Begin playback; fails when no source is assigned
    pub fn start(&mut self) -> bool {
        if self.source.is_none() {
            return false;
        }
        self.is_playing = true;
        true
    }

    pub fn stop(&mut self) {
        self.is_playing = false;
    }

    /// Return the slot to its free state, releasing the source
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Run one batch of bookkeeping for this slot: advance the fade, pull
    /// `samples` samples from the decode source into `pcm`, and describe
    /// what the lock-free mixing stage should do with them.
    ///
    /// `index` is the 1-based channel number, used for diagnostics only.
    pub fn prepare_batch(&mut self, index: u32, pcm: &mut [i16], samples: usize) -> ChannelView {
        let silent = ChannelView::silent(self.is_stereo, self.volume, self.pan);
        if !self.is_playing {
            return silent;
        }

        if self.volume == 0 && self.fade_cut && !self.is_fading() {
            pcmix_core::mixer_debug!("Channel {} cut at zero volume", index);
            self.is_playing = false;
            return silent;
        }

        if self.source.is_none() {
            self.is_playing = false;
            return silent;
        }

        let envelope = Envelope {
            start: self.volume,
            rate: self.fade_rate,
            target: self.fade_target,
            remaining: self.fade_remaining,
        };
        self.advance_fade(samples);

        let width = if self.is_stereo { 2 } else { 1 };
        let pcm = &mut pcm[..samples * width];
        pcm.fill(0);
        let more = match self.source.as_mut() {
            Some(source) => source.fill(pcm, samples),
            None => false,
        };
        if !more {
            pcmix_core::mixer_debug!("Channel {} reached end of stream", index);
            self.is_playing = false;
        }

        if self.volume == 0 && self.fade_cut && !self.is_fading() {
            pcmix_core::mixer_debug!("Channel {} faded out, stopping", index);
            self.is_playing = false;
        }

        ChannelView {
            active: true,
            is_stereo: self.is_stereo,
            envelope,
            pan: self.pan,
        }
    }

    /// Move the live volume `samples` samples along the current fade
    fn advance_fade(&mut self, samples: usize) {
        if self.fade_remaining == 0 {
            return;
        }
        let step = u32::try_from(samples).unwrap_or(u32::MAX);
        if step >= self.fade_remaining {
            self.volume = self.fade_target;
            self.fade_rate = 0;
            self.fade_remaining = 0;
        } else {
            self.volume = Envelope::ramp(self.volume, self.fade_rate, self.fade_target, step);
            self.fade_remaining -= step;
        }
    }
}

impl Default for MixerChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MixerChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixerChannel")
            .field("state", &self.state())
            .field("is_stereo", &self.is_stereo)
            .field("volume", &self.volume)
            .field("fade_rate", &self.fade_rate)
            .field("fade_target", &self.fade_target)
            .field("fade_remaining", &self.fade_remaining)
            .field("fade_cut", &self.fade_cut)
            .field("pan", &self.pan)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PcmSource;

    fn constant(value: i16, len: usize) -> Box<dyn DecodeSource> {
        Box::new(PcmSource::new(vec![value; len], false))
    }

    #[test]
    fn test_lifecycle() {
        let mut ch = MixerChannel::new();
        assert_eq!(ch.state(), ChannelState::Free);
        assert!(!ch.start());

        assert!(ch.assign(constant(1, 8), false).is_ok());
        assert_eq!(ch.state(), ChannelState::Assigned);
        assert!(ch.start());
        assert_eq!(ch.state(), ChannelState::Playing);
        ch.stop();
        assert_eq!(ch.state(), ChannelState::Assigned);

        ch.set_volume(VOLUME_ONE / 2);
        ch.reset();
        assert_eq!(ch.state(), ChannelState::Free);
        assert_eq!(ch.volume(), VOLUME_ONE);
    }

    #[test]
    fn test_second_assign_is_rejected() {
        let mut ch = MixerChannel::new();
        ch.assign(constant(1, 8), false).map_err(|_| ()).unwrap();
        assert!(ch.assign(constant(2, 8), true).is_err());
        assert!(!ch.is_stereo());

        ch.start();
        let mut pcm = [0i16; 4];
        ch.prepare_batch(1, &mut pcm, 4);
        assert_eq!(pcm, [1, 1, 1, 1]);
    }

    #[test]
    fn test_set_volume_cancels_fade() {
        let mut ch = MixerChannel::new();
        ch.set_fade(0, 100.0, true);
        assert!(ch.is_fading());
        ch.set_volume(VOLUME_ONE);
        assert!(!ch.is_fading());
        assert!(!ch.fade_cut);
    }

    #[test]
    fn test_fade_advances_per_batch() {
        let mut ch = MixerChannel::new();
        ch.assign(constant(0, 64), false).map_err(|_| ()).unwrap();
        ch.start();
        ch.set_fade(0, 8.0, false);

        let mut pcm = [0i16; 8];
        let view = ch.prepare_batch(1, &mut pcm, 4);
        assert_eq!(view.envelope.start, VOLUME_ONE);
        assert_eq!(ch.volume(), VOLUME_ONE / 2);
        assert!(ch.is_fading());

        ch.prepare_batch(1, &mut pcm, 4);
        assert_eq!(ch.volume(), 0);
        assert!(!ch.is_fading());
        assert!(ch.is_playing());
    }

    #[test]
    fn test_fade_cut_stops_playback() {
        let mut ch = MixerChannel::new();
        ch.assign(constant(0, 64), false).map_err(|_| ()).unwrap();
        ch.start();
        ch.set_fade(0, 6.0, true);

        let mut pcm = [0i16; 8];
        let view = ch.prepare_batch(1, &mut pcm, 8);
        assert!(view.active);
        assert_eq!(ch.volume(), 0);
        assert!(!ch.is_playing());
        assert_eq!(ch.state(), ChannelState::Assigned);

        // Restarting at zero volume with the cut still armed stops at once
        ch.start();
        let view = ch.prepare_batch(1, &mut pcm, 8);
        assert!(!view.active);
        assert!(!ch.is_playing());
    }

    #[test]
    fn test_end_of_stream_stops_playback() {
        let mut ch = MixerChannel::new();
        ch.assign(constant(3, 3), false).map_err(|_| ()).unwrap();
        ch.start();

        let mut pcm = [9i16; 4];
        let view = ch.prepare_batch(1, &mut pcm, 4);
        assert!(view.active);
        assert_eq!(pcm, [3, 3, 3, 0]);
        assert!(!ch.is_playing());
        assert!(ch.is_assigned());
    }

    #[test]
    fn test_idle_channel_is_silent() {
        let mut ch = MixerChannel::new();
        ch.assign(constant(3, 3), false).map_err(|_| ()).unwrap();
        let mut pcm = [0i16; 4];
        let view = ch.prepare_batch(1, &mut pcm, 4);
        assert!(!view.active);
    }
}
