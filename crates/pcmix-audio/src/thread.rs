//! Audio thread

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use pcmix_core::{backend_debug, backend_trace};

use crate::backend::{AudioBackend, NullAudioBackend};
use crate::error::{MixerError, Result};
use crate::mixer::Mixer;

/// Audio thread state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioThreadState {
    Stopped,
    Running,
}

/// Thread that pulls mixed audio and submits it to a push backend, one
/// period at a time.
pub struct AudioThread {
    state: AudioThreadState,
    mixer: Arc<Mixer>,
    /// Held here while stopped; owned by the worker while running
    backend: Option<Box<dyn AudioBackend>>,
    period: usize,
    paced: bool,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<Box<dyn AudioBackend>>>,
}

impl AudioThread {
    /// Create a stopped audio thread pulling `period` samples per
    /// submission. Submissions are paced to real time.
    pub fn with_backend(mixer: Arc<Mixer>, backend: Box<dyn AudioBackend>, period: usize) -> Self {
        Self {
            state: AudioThreadState::Stopped,
            mixer,
            backend: Some(backend),
            period: period.max(1),
            paced: true,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Create a stopped audio thread using the null backend
    pub fn new(mixer: Arc<Mixer>, period: usize) -> Self {
        Self::with_backend(mixer, Box::new(NullAudioBackend::new()), period)
    }

    /// Submit as fast as the backend accepts instead of at the mix rate
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    /// Start the backend and spawn the worker
    pub fn start(&mut self) -> Result<()> {
        if self.state == AudioThreadState::Running {
            return Ok(());
        }
        let Some(mut backend) = self.backend.take() else {
            return Err(MixerError::Backend("audio backend unavailable".into()));
        };
        if let Err(err) = backend.start() {
            self.backend = Some(backend);
            return Err(err);
        }

        self.running.store(true, Ordering::Release);
        let worker = Worker {
            mixer: Arc::clone(&self.mixer),
            running: Arc::clone(&self.running),
            period: self.period,
            paced: self.paced,
        };
        let spawned = thread::Builder::new()
            .name("pcmix-audio".into())
            .spawn(move || worker.run(backend));

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                self.state = AudioThreadState::Running;
                backend_debug!("Audio thread started ({} samples per period)", self.period);
                Ok(())
            }
            Err(err) => {
                self.running.store(false, Ordering::Release);
                Err(MixerError::Backend(format!("failed to spawn audio thread: {}", err)))
            }
        }
    }

    /// Stop the worker, wait for it to exit and stop the backend
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(mut backend) => {
                    backend.stop();
                    self.backend = Some(backend);
                }
                Err(_) => tracing::error!("Audio thread panicked"),
            }
            backend_debug!("Audio thread stopped");
        }
        self.state = AudioThreadState::Stopped;
    }

    /// Get current state.
    pub fn state(&self) -> AudioThreadState {
        self.state
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Drop for AudioThread {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    mixer: Arc<Mixer>,
    running: Arc<AtomicBool>,
    period: usize,
    paced: bool,
}

impl Worker {
    fn run(self, mut backend: Box<dyn AudioBackend>) -> Box<dyn AudioBackend> {
        let mut buffer = vec![0i16; self.period * 2];
        let period_time =
            Duration::from_secs_f64(self.period as f64 / f64::from(self.mixer.mix_rate()));
        let mut deadline = Instant::now();

        while self.running.load(Ordering::Acquire) {
            self.mixer.get_pcm(&mut buffer);
            if let Err(err) = backend.play_samples(&buffer) {
                tracing::error!("Audio backend rejected samples: {}", err);
                break;
            }
            backend_trace!("Submitted {} samples", self.period);

            if self.paced {
                deadline += period_time;
                let now = Instant::now();
                match deadline.checked_duration_since(now) {
                    Some(wait) => thread::sleep(wait),
                    // Fell behind; don't try to catch up
                    None => deadline = now,
                }
            }
        }
        self.running.store(false, Ordering::Release);
        backend
    }
}
