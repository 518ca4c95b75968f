use std::sync::Arc;

use async_trait::async_trait;
use shared::{error::GenerationError, protocol::GenerationConfig};
use tracing::{error, info};

pub mod audio;
pub mod config;
mod gemini;
pub mod intro;
pub mod orchestrator;
pub mod synth;
pub mod typing;

pub use config::{load_settings, load_settings_from, Settings};
pub use gemini::GeminiBackend;

pub const EMPTY_SITUATION_PROMPT: &str =
    "Please tell me the situation first, and I'll whip up an excuse for you!";
pub const MISSING_API_KEY_MESSAGE: &str =
    "API Key is missing. Please configure your environment.";
pub const FIZZLED_MESSAGE: &str = "Oops! My creative spark fizzled out. This might be due to a configuration issue or a network problem. Please try again in a moment.";

/// Persona sent as the system instruction on every request.
pub const PERSONA_INSTRUCTION: &str = r#"You are Get Me Out, a master wordsmith specializing in crafting believable, humorous, and charming excuses for a guy to tell his girlfriend.
Your primary goal is to de-escalate a minor situation with wit and affection, transforming a potential conflict into a moment of shared laughter. This is for lighthearted fun, not for fabricating lies about serious matters.

**Your Mission:**
1. **Analyze the Situation:** Deeply consider the user's input (e.g., 'Forgot our anniversary', 'Spilled wine on her dress').
2. **Select a Tone:** Based on the situation, choose a suitable tone. Examples include:
   * **Playfully Forgetful:** Blame it on a charmingly faulty memory.
   * **Endearingly Flustered:** Get tangled up in a sweet, silly explanation.
   * **Wildly Imaginative:** Invent a brief, absurd, and hilarious scenario.
   * **Sweetly Incompetent:** Frame the mistake as a failed attempt at doing something good.
3. **Craft the Excuse:** Generate a short, sweet excuse (2-3 sentences max) that fits the chosen tone and the specific context.

**Crucial Rules:**
- Never be disrespectful, misogynistic, or promote serious dishonesty.
- Keep it concise and impactful.
- **Do not wrap your final response in quotes.**"#;

pub fn excuse_prompt(situation: &str) -> String {
    format!("Generate an excuse for this situation: \"{situation}\"")
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instruction: String,
    pub prompt: String,
    pub config: GenerationConfig,
}

#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Returns the raw text of the first candidate.
    async fn generate_content(&self, request: &GenerationRequest)
        -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExcuseReply {
    Generated(String),
    NeedsSituation(String),
    Unconfigured(String),
    Fizzled(String),
}

impl ExcuseReply {
    pub fn text(&self) -> &str {
        match self {
            Self::Generated(text)
            | Self::NeedsSituation(text)
            | Self::Unconfigured(text)
            | Self::Fizzled(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Generated(text)
            | Self::NeedsSituation(text)
            | Self::Unconfigured(text)
            | Self::Fizzled(text) => text,
        }
    }

    /// Replies that belong in the error region rather than the result region.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Unconfigured(_) | Self::Fizzled(_))
    }
}

/// Turns a situation into an excuse. Every call resolves to text; failures
/// become one of the canned messages above.
pub struct ExcuseClient {
    backend: Option<Arc<dyn GenerativeBackend>>,
    model: String,
    sampling: GenerationConfig,
}

impl ExcuseClient {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        model: impl Into<String>,
        sampling: GenerationConfig,
    ) -> Self {
        Self {
            backend: Some(backend),
            model: model.into(),
            sampling,
        }
    }

    pub fn unconfigured() -> Self {
        let defaults = Settings::default();
        let sampling = sampling_config(&defaults);
        Self {
            backend: None,
            model: defaults.model,
            sampling,
        }
    }

    /// Never fails: a missing key or an unusable service url yields a client
    /// that answers every request with [`MISSING_API_KEY_MESSAGE`].
    pub fn from_settings(settings: &Settings) -> Self {
        let Some(api_key) = settings.api_key.as_deref() else {
            error!("API key is not set; set API_KEY or GEMINI_API_KEY to enable excuse generation");
            return Self::unconfigured();
        };

        match GeminiBackend::new(&settings.api_base_url, api_key) {
            Ok(backend) => Self::new(
                Arc::new(backend),
                settings.model.clone(),
                sampling_config(settings),
            ),
            Err(err) => {
                error!("excuse generation disabled: {err:#}");
                Self::unconfigured()
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn request_for(&self, situation: &str) -> GenerationRequest {
        GenerationRequest {
            model: self.model.clone(),
            system_instruction: PERSONA_INSTRUCTION.to_string(),
            prompt: excuse_prompt(situation),
            config: self.sampling,
        }
    }

    pub async fn generate_excuse(&self, situation: &str) -> ExcuseReply {
        if situation.trim().is_empty() {
            return ExcuseReply::NeedsSituation(EMPTY_SITUATION_PROMPT.to_string());
        }

        let Some(backend) = &self.backend else {
            return ExcuseReply::Unconfigured(MISSING_API_KEY_MESSAGE.to_string());
        };

        let request = self.request_for(situation);
        info!(model = %request.model, situation_len = situation.len(), "requesting excuse");

        match backend.generate_content(&request).await {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    error!("error generating excuse: {}", GenerationError::EmptyResponse);
                    return ExcuseReply::Fizzled(FIZZLED_MESSAGE.to_string());
                }
                ExcuseReply::Generated(trimmed.to_string())
            }
            Err(err) => {
                error!(kind = ?err.kind(), "error generating excuse: {err}");
                ExcuseReply::Fizzled(FIZZLED_MESSAGE.to_string())
            }
        }
    }
}

fn sampling_config(settings: &Settings) -> GenerationConfig {
    GenerationConfig {
        temperature: settings.sampling.temperature,
        top_k: settings.sampling.top_k,
        top_p: settings.sampling.top_p,
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
