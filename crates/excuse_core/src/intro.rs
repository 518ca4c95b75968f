use std::{sync::Arc, time::Duration};

use shared::domain::SoundCue;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::debug;

use crate::audio::AudioEngine;

pub const INTRO_PHRASES: [&str; 5] = [
    "Trapped?",
    "Need an out?",
    "Stuck?",
    "Cornered?",
    "In a jam?",
];
pub const FINAL_TITLE: &str = "Get Me Out";
pub const PHRASE_INTERVAL: Duration = Duration::from_secs(1);
pub const TITLE_HOLD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntroScript {
    pub phrases: Vec<String>,
    pub final_title: String,
    pub interval: Duration,
    pub hold: Duration,
}

impl Default for IntroScript {
    fn default() -> Self {
        Self {
            phrases: INTRO_PHRASES.iter().map(|p| p.to_string()).collect(),
            final_title: FINAL_TITLE.to_string(),
            interval: PHRASE_INTERVAL,
            hold: TITLE_HOLD,
        }
    }
}

impl IntroScript {
    pub fn phrase_offset(&self, index: usize) -> Duration {
        self.interval * index as u32
    }

    pub fn title_offset(&self) -> Duration {
        self.interval * self.phrases.len() as u32
    }

    pub fn completion_offset(&self) -> Duration {
        self.title_offset() + self.hold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroPhase {
    Phrase(usize),
    FinalTitle,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntroEvent {
    Phrase { index: usize, text: String },
    TitleRevealed(String),
    Completed,
}

pub struct IntroSequence {
    script: Arc<IntroScript>,
    task: JoinHandle<()>,
    phase: watch::Receiver<IntroPhase>,
    events: mpsc::UnboundedReceiver<IntroEvent>,
}

impl IntroSequence {
    /// Starts the timers. Must be called from within a tokio runtime.
    pub fn start(script: IntroScript, audio: Option<Arc<AudioEngine>>) -> Self {
        let script = Arc::new(script);
        let initial = if script.phrases.is_empty() {
            IntroPhase::FinalTitle
        } else {
            IntroPhase::Phrase(0)
        };
        let (phase_tx, phase) = watch::channel(initial);
        let (events_tx, events) = mpsc::unbounded_channel();

        let started = Instant::now();
        let task = tokio::spawn(run_intro(
            script.clone(),
            started,
            phase_tx,
            events_tx,
            audio,
        ));

        Self {
            script,
            task,
            phase,
            events,
        }
    }

    pub fn script(&self) -> &IntroScript {
        &self.script
    }

    pub fn phase(&self) -> IntroPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<IntroPhase> {
        self.phase.clone()
    }

    pub async fn next_event(&mut self) -> Option<IntroEvent> {
        self.events.recv().await
    }

    /// Resolves when the sequence completes. Returns `false` if it was
    /// cancelled first.
    pub async fn finished(&mut self) -> bool {
        self.phase
            .wait_for(|phase| *phase == IntroPhase::Complete)
            .await
            .is_ok()
    }

    pub fn dismiss(self) {
        debug!("intro dismissed");
    }
}

impl Drop for IntroSequence {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_intro(
    script: Arc<IntroScript>,
    started: Instant,
    phase_tx: watch::Sender<IntroPhase>,
    events_tx: mpsc::UnboundedSender<IntroEvent>,
    audio: Option<Arc<AudioEngine>>,
) {
    let cue = |sound: SoundCue| {
        if let Some(audio) = &audio {
            audio.play(sound);
        }
    };

    for (index, text) in script.phrases.iter().enumerate() {
        sleep_until(started + script.phrase_offset(index)).await;
        phase_tx.send_replace(IntroPhase::Phrase(index));
        cue(SoundCue::IntroGlitch);
        let _ = events_tx.send(IntroEvent::Phrase {
            index,
            text: text.clone(),
        });
    }

    sleep_until(started + script.title_offset()).await;
    phase_tx.send_replace(IntroPhase::FinalTitle);
    cue(SoundCue::IntroReveal);
    let _ = events_tx.send(IntroEvent::TitleRevealed(script.final_title.clone()));

    sleep_until(started + script.completion_offset()).await;
    phase_tx.send_replace(IntroPhase::Complete);
    let _ = events_tx.send(IntroEvent::Completed);
    debug!("intro completed");
}

#[cfg(test)]
#[path = "tests/intro_tests.rs"]
mod tests;
