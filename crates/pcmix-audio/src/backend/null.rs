//! Null audio backend

use crate::error::Result;

use super::AudioBackend;

/// Null audio backend (no sound output)
#[derive(Debug, Default)]
pub struct NullAudioBackend {
    pub(crate) started: bool,
    pub(crate) last_samples: Option<Vec<i16>>,
    pub(crate) frames_played: u64,
}

impl NullAudioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Returns the last samples that were submitted (useful for tests)
    pub fn last_samples(&self) -> Option<&[i16]> {
        self.last_samples.as_deref()
    }

    /// Stereo frames submitted since the last start
    pub fn frames_played(&self) -> u64 {
        self.frames_played
    }
}

impl AudioBackend for NullAudioBackend {
    fn start(&mut self) -> Result<()> {
        self.started = true;
        self.frames_played = 0;
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
        self.last_samples = None;
    }

    fn play_samples(&mut self, samples: &[i16]) -> Result<()> {
        if self.started {
            self.last_samples = Some(samples.to_vec());
            self.frames_played += (samples.len() / 2) as u64;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_only_while_started() {
        let mut backend = NullAudioBackend::new();
        backend.play_samples(&[1, 2]).unwrap();
        assert!(backend.last_samples().is_none());

        backend.start().unwrap();
        backend.play_samples(&[1, 2, 3, 4]).unwrap();
        assert_eq!(backend.last_samples(), Some(&[1, 2, 3, 4][..]));
        assert_eq!(backend.frames_played(), 2);

        backend.stop();
        assert!(!backend.is_started());
        assert!(backend.last_samples().is_none());
    }
}
