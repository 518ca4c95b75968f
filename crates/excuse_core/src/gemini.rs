use async_trait::async_trait;
use reqwest::Client;
use shared::{
    error::{GenerationError, ServiceErrorEnvelope},
    protocol::{Content, GenerateContentRequest, GenerateContentResponse},
};
use url::Url;

use crate::{GenerationRequest, GenerativeBackend};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// HTTP backend for the Gemini `generateContent` endpoint.
pub struct GeminiBackend {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_client(Client::new(), base_url, api_key)
    }

    pub fn with_client(
        http: Client,
        base_url: &str,
        api_key: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|err| anyhow::anyhow!("invalid generative service url '{base_url}': {err}"))?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    pub fn endpoint(&self, model: &str) -> Url {
        let path = format!(
            "{}/v1beta/models/{model}:generateContent",
            self.base_url.path().trim_end_matches('/')
        );
        let mut url = self.base_url.clone();
        url.set_path(&path);
        url
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        let body = GenerateContentRequest {
            system_instruction: Content::system(request.system_instruction.clone()),
            contents: vec![Content::user(request.prompt.clone())],
            generation_config: request.config,
        };

        let response = self
            .http
            .post(self.endpoint(&request.model))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| GenerationError::Transport(err.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|err| GenerationError::Transport(err.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ServiceErrorEnvelope>(&raw)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&raw)
            .map_err(|err| GenerationError::Malformed(err.to_string()))?;
        parsed.text().ok_or(GenerationError::EmptyResponse)
    }
}

#[cfg(test)]
#[path = "tests/gemini_tests.rs"]
mod tests;
