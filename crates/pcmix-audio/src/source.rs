//! Decode sources feeding mixer channels
//!
//! A decode source produces interleaved 16-bit PCM on demand. The mixer
//! calls [`DecodeSource::fill`] once per batch for each playing channel,
//! with the control lock held, so implementations must return promptly
//! and must never call back into the mixer.

use std::f64::consts::TAU;

/// Producer of interleaved PCM for one channel
pub trait DecodeSource: Send {
    /// Write up to `samples` samples into `pcm` (one value per sample for
    /// mono, two for stereo). `pcm` arrives zeroed, so a short fill leaves
    /// silence behind it. Returns `false` once no further data is or will
    /// be available; whatever was written by that call is still played.
    fn fill(&mut self, pcm: &mut [i16], samples: usize) -> bool;
}

impl<F> DecodeSource for F
where
    F: FnMut(&mut [i16], usize) -> bool + Send,
{
    fn fill(&mut self, pcm: &mut [i16], samples: usize) -> bool {
        self(pcm, samples)
    }
}

/// Plays a PCM buffer held in memory
#[derive(Debug, Clone)]
pub struct PcmSource {
    data: Vec<i16>,
    stereo: bool,
    looping: bool,
    /// Read position in samples (frames for stereo)
    position: usize,
}

impl PcmSource {
    /// Create a source over interleaved `data`. A trailing odd value in
    /// stereo data is ignored.
    pub fn new(data: Vec<i16>, stereo: bool) -> Self {
        Self {
            data,
            stereo,
            looping: false,
            position: 0,
        }
    }

    /// Restart from the beginning when the end is reached
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Whether this source produces stereo samples
    pub fn is_stereo(&self) -> bool {
        self.stereo
    }

    /// Total length in samples
    pub fn len(&self) -> usize {
        self.data.len() / self.width()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current read position in samples
    pub fn position(&self) -> usize {
        self.position
    }

    fn width(&self) -> usize {
        if self.stereo {
            2
        } else {
            1
        }
    }
}

impl DecodeSource for PcmSource {
    fn fill(&mut self, pcm: &mut [i16], samples: usize) -> bool {
        let width = self.width();
        let total = self.len();
        let wanted = samples.min(pcm.len() / width);

        let mut written = 0;
        while written < wanted {
            if self.position >= total {
                if self.looping && total > 0 {
                    self.position = 0;
                } else {
                    break;
                }
            }
            let count = (wanted - written).min(total - self.position);
            let src = &self.data[self.position * width..(self.position + count) * width];
            pcm[written * width..(written + count) * width].copy_from_slice(src);
            written += count;
            self.position += count;
        }

        if self.looping {
            total > 0
        } else {
            self.position < total
        }
    }
}

/// Sine-wave generator
#[derive(Debug, Clone)]
pub struct ToneSource {
    phase: f64,
    step: f64,
    amplitude: f64,
    stereo: bool,
    /// Samples left to generate; `None` runs forever
    remaining: Option<u64>,
}

impl ToneSource {
    /// Create an endless tone of `frequency` Hz at `rate` Hz with the given
    /// peak amplitude
    pub fn new(frequency: f32, amplitude: i16, rate: u32) -> Self {
        Self {
            phase: 0.0,
            step: TAU * f64::from(frequency) / f64::from(rate.max(1)),
            amplitude: f64::from(amplitude),
            stereo: false,
            remaining: None,
        }
    }

    /// Emit the same signal on both sides of a stereo pair
    pub fn stereo(mut self, stereo: bool) -> Self {
        self.stereo = stereo;
        self
    }

    /// Stop after `samples` samples
    pub fn limited(mut self, samples: u64) -> Self {
        self.remaining = Some(samples);
        self
    }

    pub fn is_stereo(&self) -> bool {
        self.stereo
    }
}

impl DecodeSource for ToneSource {
    fn fill(&mut self, pcm: &mut [i16], samples: usize) -> bool {
        let width = if self.stereo { 2 } else { 1 };
        let mut count = samples.min(pcm.len() / width);
        if let Some(remaining) = self.remaining {
            count = count.min(usize::try_from(remaining).unwrap_or(usize::MAX));
        }

        for frame in pcm.chunks_exact_mut(width).take(count) {
            let value = (self.phase.sin() * self.amplitude).round() as i16;
            frame.fill(value);
            self.phase = (self.phase + self.step) % TAU;
        }

        match self.remaining.as_mut() {
            Some(remaining) => {
                *remaining -= count as u64;
                *remaining > 0
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_source_pads_and_ends() {
        let mut source = PcmSource::new(vec![1, 2, 3], false);
        let mut pcm = [0i16; 4];
        assert!(!source.fill(&mut pcm, 4));
        assert_eq!(pcm, [1, 2, 3, 0]);
        assert_eq!(source.position(), 3);
    }

    #[test]
    fn test_pcm_source_reports_more_data() {
        let mut source = PcmSource::new(vec![1, -1, 2, -2, 3, -3], true);
        assert_eq!(source.len(), 3);

        let mut pcm = [0i16; 4];
        assert!(source.fill(&mut pcm, 2));
        assert_eq!(pcm, [1, -1, 2, -2]);

        let mut pcm = [0i16; 4];
        assert!(!source.fill(&mut pcm, 2));
        assert_eq!(pcm, [3, -3, 0, 0]);
    }

    #[test]
    fn test_pcm_source_loops() {
        let mut source = PcmSource::new(vec![7, 8], false).looping(true);
        let mut pcm = [0i16; 5];
        assert!(source.fill(&mut pcm, 5));
        assert_eq!(pcm, [7, 8, 7, 8, 7]);

        let mut empty = PcmSource::new(Vec::new(), false).looping(true);
        assert!(!empty.fill(&mut pcm, 5));
    }

    #[test]
    fn test_tone_source_limits_length() {
        let mut tone = ToneSource::new(441.0, 1000, 44100).limited(150);
        let mut pcm = [0i16; 100];
        assert!(tone.fill(&mut pcm, 100));
        assert_eq!(pcm[0], 0);
        assert!(pcm.iter().any(|&s| s > 900));

        let mut pcm = [0i16; 100];
        assert!(!tone.fill(&mut pcm, 100));
        assert!(pcm[50..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_tone_source_stereo_duplicates() {
        let mut tone = ToneSource::new(1000.0, 8000, 48000).stereo(true);
        let mut pcm = [0i16; 64];
        assert!(tone.fill(&mut pcm, 32));
        assert!(pcm.chunks_exact(2).all(|f| f[0] == f[1]));
    }

    #[test]
    fn test_closure_source() {
        let mut calls = 0;
        let mut source = move |pcm: &mut [i16], samples: usize| {
            calls += 1;
            pcm[..samples].fill(5);
            calls < 2
        };
        let mut pcm = [0i16; 3];
        assert!(DecodeSource::fill(&mut source, &mut pcm, 3));
        assert!(!DecodeSource::fill(&mut source, &mut pcm, 3));
        assert_eq!(pcm, [5, 5, 5]);
    }
}
