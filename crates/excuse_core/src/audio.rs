use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use shared::domain::SoundCue;
use thiserror::Error;
use tracing::{debug, warn};

use crate::synth::{self, DroneSpec, SAMPLE_RATE};

const DRONE_FADE: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
    #[error("audio playback failed: {0}")]
    Playback(String),
}

pub trait OutputDevice: Send {
    /// `false` when buffers are ignored; the engine then skips rendering.
    fn accepts_samples(&self) -> bool {
        true
    }
    fn play(&mut self, cue: SoundCue, samples: Vec<f32>) -> Result<(), AudioError>;
    fn start_loop(&mut self, samples: Vec<f32>) -> Result<(), AudioError>;
    /// Stops the loop, playing `fade_tail` in its place.
    fn stop_loop(&mut self, fade_tail: Vec<f32>) -> Result<(), AudioError>;
}

pub trait OutputDeviceFactory: Send + Sync {
    fn open(&self, sample_rate: u32) -> Result<Box<dyn OutputDevice>, AudioError>;
}

impl<F> OutputDeviceFactory for F
where
    F: Fn(u32) -> Result<Box<dyn OutputDevice>, AudioError> + Send + Sync,
{
    fn open(&self, sample_rate: u32) -> Result<Box<dyn OutputDevice>, AudioError> {
        self(sample_rate)
    }
}

pub struct SilentDevice;

impl OutputDevice for SilentDevice {
    fn accepts_samples(&self) -> bool {
        false
    }

    fn play(&mut self, _cue: SoundCue, _samples: Vec<f32>) -> Result<(), AudioError> {
        Ok(())
    }

    fn start_loop(&mut self, _samples: Vec<f32>) -> Result<(), AudioError> {
        Ok(())
    }

    fn stop_loop(&mut self, _fade_tail: Vec<f32>) -> Result<(), AudioError> {
        Ok(())
    }
}

enum DeviceSlot {
    Unopened,
    Open(Box<dyn OutputDevice>),
    Unavailable,
}

struct ActiveTone {
    started_at: Instant,
}

struct AudioState {
    device: DeviceSlot,
    generating: Option<ActiveTone>,
}

pub struct AudioEngine {
    factory: Box<dyn OutputDeviceFactory>,
    drone: DroneSpec,
    state: Mutex<AudioState>,
}

impl AudioEngine {
    pub fn new(factory: impl OutputDeviceFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            drone: DroneSpec::default(),
            state: Mutex::new(AudioState {
                device: DeviceSlot::Unopened,
                generating: None,
            }),
        }
    }

    pub fn muted() -> Self {
        Self::new(|_sample_rate: u32| -> Result<Box<dyn OutputDevice>, AudioError> {
            Ok(Box::new(SilentDevice))
        })
    }

    fn lock(&self) -> MutexGuard<'_, AudioState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn device<'a>(&self, state: &'a mut AudioState) -> Option<&'a mut Box<dyn OutputDevice>> {
        if matches!(state.device, DeviceSlot::Unopened) {
            state.device = match self.factory.open(SAMPLE_RATE) {
                Ok(device) => DeviceSlot::Open(device),
                Err(err) => {
                    warn!("sound disabled for this session: {err}");
                    DeviceSlot::Unavailable
                }
            };
        }

        match &mut state.device {
            DeviceSlot::Open(device) => Some(device),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.lock().device, DeviceSlot::Open(_))
    }

    pub fn play(&self, cue: SoundCue) -> bool {
        let mut state = self.lock();
        let Some(device) = self.device(&mut state) else {
            return false;
        };
        let samples = if device.accepts_samples() {
            synth::preset(cue).render(SAMPLE_RATE)
        } else {
            Vec::new()
        };
        match device.play(cue, samples) {
            Ok(()) => {
                debug!(cue = cue.name(), "played sound cue");
                true
            }
            Err(err) => {
                warn!(cue = cue.name(), "failed to play sound cue: {err}");
                false
            }
        }
    }

    pub fn is_generating(&self) -> bool {
        self.lock().generating.is_some()
    }

    /// Starts the generating drone. Returns `false` if one is already active
    /// or there is no device.
    pub fn start_generating(&self) -> bool {
        let mut state = self.lock();
        if state.generating.is_some() {
            return false;
        }
        let Some(device) = self.device(&mut state) else {
            return false;
        };
        let samples = if device.accepts_samples() {
            self.drone.render_loop(SAMPLE_RATE)
        } else {
            Vec::new()
        };
        if let Err(err) = device.start_loop(samples) {
            warn!("failed to start generating tone: {err}");
            return false;
        }
        state.generating = Some(ActiveTone {
            started_at: Instant::now(),
        });
        true
    }

    pub fn stop_generating(&self) -> bool {
        let mut state = self.lock();
        let Some(tone) = state.generating.take() else {
            return false;
        };
        debug!(
            elapsed_ms = tone.started_at.elapsed().as_millis() as u64,
            "stopping generating tone"
        );

        if let DeviceSlot::Open(device) = &mut state.device {
            let tail = if device.accepts_samples() {
                self.fade_tail()
            } else {
                Vec::new()
            };
            if let Err(err) = device.stop_loop(tail) {
                warn!("failed to stop generating tone: {err}");
            }
        }
        true
    }

    fn fade_tail(&self) -> Vec<f32> {
        let fade_len = (DRONE_FADE.as_secs_f32() * SAMPLE_RATE as f32) as usize;
        let mut tail = self.drone.render_loop(SAMPLE_RATE);
        tail.truncate(fade_len);
        synth::apply_fade_out(&mut tail);
        tail
    }

    /// Stops the drone and closes the device. A later cue reopens it.
    pub fn shutdown(&self) {
        self.stop_generating();
        self.lock().device = DeviceSlot::Unopened;
    }
}

#[cfg(test)]
#[path = "tests/audio_tests.rs"]
mod tests;
