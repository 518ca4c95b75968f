use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Service,
    Malformed,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed service response: {0}")]
    Malformed(String),
    #[error("service response contained no text")]
    EmptyResponse,
}

impl GenerationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) => FailureKind::Transport,
            Self::Status { .. } => FailureKind::Service,
            Self::Malformed(_) | Self::EmptyResponse => FailureKind::Malformed,
        }
    }
}

/// Service-side error body, e.g. `{"error": {"code": 400, "message": "...", "status": "INVALID_ARGUMENT"}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceError {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceErrorEnvelope {
    pub error: ServiceError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_failures() {
        assert_eq!(
            GenerationError::Transport("reset".into()).kind(),
            FailureKind::Transport
        );
        assert_eq!(
            GenerationError::Status {
                status: 503,
                message: "overloaded".into()
            }
            .kind(),
            FailureKind::Service
        );
        assert_eq!(GenerationError::EmptyResponse.kind(), FailureKind::Malformed);
    }

    #[test]
    fn parses_service_error_envelope() {
        let raw = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        let envelope: ServiceErrorEnvelope = serde_json::from_str(raw).expect("envelope");
        assert_eq!(envelope.error.code, 400);
        assert_eq!(envelope.error.status.as_deref(), Some("INVALID_ARGUMENT"));
    }
}
