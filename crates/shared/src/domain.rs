use serde::{Deserialize, Serialize};

/// What the result region of the interface shows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "text", rename_all = "snake_case")]
pub enum RequestState {
    #[default]
    Idle,
    Pending,
    Succeeded(String),
    Failed(String),
}

impl RequestState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn result(&self) -> Option<&str> {
        match self {
            Self::Succeeded(text) => Some(text),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    Click,
    Success,
    Copy,
    Typing,
    IntroGlitch,
    IntroReveal,
}

impl SoundCue {
    pub const ALL: [SoundCue; 6] = [
        SoundCue::Click,
        SoundCue::Success,
        SoundCue::Copy,
        SoundCue::Typing,
        SoundCue::IntroGlitch,
        SoundCue::IntroReveal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SoundCue::Click => "click",
            SoundCue::Success => "success",
            SoundCue::Copy => "copy",
            SoundCue::Typing => "typing",
            SoundCue::IntroGlitch => "intro_glitch",
            SoundCue::IntroReveal => "intro_reveal",
        }
    }
}
