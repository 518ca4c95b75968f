use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use shared::domain::{RequestState, SoundCue};
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tracing::{info, warn};

use crate::{
    audio::AudioEngine, ExcuseClient, ExcuseReply, EMPTY_SITUATION_PROMPT,
    MISSING_API_KEY_MESSAGE,
};

pub const COPY_RESET_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard write failed: {0}")]
    Write(String),
}

pub trait ClipboardSink: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    /// Shown without a request: blank situation or no credential.
    AnsweredLocally,
    IgnoredWhilePending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    NothingToCopy,
    AlreadyCopied,
}

struct Inner {
    client: ExcuseClient,
    audio: Option<Arc<AudioEngine>>,
    state: watch::Sender<RequestState>,
    copied: watch::Sender<bool>,
    situation: Mutex<String>,
    copy_reset: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn cue(&self, sound: SoundCue) {
        if let Some(audio) = &self.audio {
            audio.play(sound);
        }
    }
}

#[derive(Clone)]
pub struct ExcuseOrchestrator {
    inner: Arc<Inner>,
}

impl ExcuseOrchestrator {
    pub fn new(client: ExcuseClient, audio: Option<Arc<AudioEngine>>) -> Self {
        let (state, _) = watch::channel(RequestState::Idle);
        let (copied, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                client,
                audio,
                state,
                copied,
                situation: Mutex::new(String::new()),
                copy_reset: Mutex::new(None),
            }),
        }
    }

    pub fn set_situation(&self, text: impl Into<String>) {
        *self
            .inner
            .situation
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = text.into();
    }

    pub fn situation(&self) -> String {
        self.inner
            .situation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> RequestState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<RequestState> {
        self.inner.state.subscribe()
    }

    pub fn is_copied(&self) -> bool {
        *self.inner.copied.borrow()
    }

    pub fn subscribe_copied(&self) -> watch::Receiver<bool> {
        self.inner.copied.subscribe()
    }

    pub fn can_trigger(&self) -> bool {
        !self.inner.state.borrow().is_pending() && !self.situation().is_empty()
    }

    pub fn trigger(&self) -> TriggerOutcome {
        let situation = self.situation();

        if situation.trim().is_empty() {
            return self.answer_locally(RequestState::Succeeded(
                EMPTY_SITUATION_PROMPT.to_string(),
            ));
        }
        if !self.inner.client.is_configured() {
            return self.answer_locally(RequestState::Failed(MISSING_API_KEY_MESSAGE.to_string()));
        }

        let entered = self.inner.state.send_if_modified(|state| {
            if state.is_pending() {
                return false;
            }
            *state = RequestState::Pending;
            true
        });
        if !entered {
            return TriggerOutcome::IgnoredWhilePending;
        }

        self.inner.cue(SoundCue::Click);
        if let Some(audio) = &self.inner.audio {
            audio.start_generating();
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let reply = inner.client.generate_excuse(&situation).await;

            if let Some(audio) = &inner.audio {
                audio.stop_generating();
            }
            if matches!(reply, ExcuseReply::Generated(_)) {
                inner.cue(SoundCue::Success);
            }

            let next = if reply.is_failure() {
                RequestState::Failed(reply.into_text())
            } else {
                RequestState::Succeeded(reply.into_text())
            };
            info!(failed = next.error().is_some(), "excuse request settled");
            inner.state.send_replace(next);
        });

        TriggerOutcome::Started
    }

    fn answer_locally(&self, answer: RequestState) -> TriggerOutcome {
        let answered = self.inner.state.send_if_modified(|state| {
            if state.is_pending() {
                return false;
            }
            *state = answer;
            true
        });
        if answered {
            TriggerOutcome::AnsweredLocally
        } else {
            TriggerOutcome::IgnoredWhilePending
        }
    }

    pub async fn wait_settled(&self) -> RequestState {
        let mut rx = self.inner.state.subscribe();
        let settled = rx
            .wait_for(|state| !state.is_pending())
            .await
            .map(|state| state.clone());
        settled.unwrap_or_else(|_| self.state())
    }

    /// Copies the displayed excuse and raises the copied flag for
    /// [`COPY_RESET_DELAY`]. Must be called from within a tokio runtime.
    pub fn copy_result(
        &self,
        clipboard: &dyn ClipboardSink,
    ) -> Result<CopyOutcome, ClipboardError> {
        let text = match self.inner.state.borrow().result() {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => return Ok(CopyOutcome::NothingToCopy),
        };
        if self.is_copied() {
            return Ok(CopyOutcome::AlreadyCopied);
        }

        if let Err(err) = clipboard.write_text(&text) {
            warn!("failed to copy excuse: {err}");
            return Err(err);
        }

        self.inner.cue(SoundCue::Copy);
        self.inner.copied.send_replace(true);

        let inner = self.inner.clone();
        let reset = tokio::spawn(async move {
            sleep(COPY_RESET_DELAY).await;
            inner.copied.send_replace(false);
        });
        let previous = self
            .inner
            .copy_reset
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(reset);
        if let Some(previous) = previous {
            previous.abort();
        }

        Ok(CopyOutcome::Copied)
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
