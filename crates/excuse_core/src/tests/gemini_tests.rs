use super::*;
use crate::{ExcuseClient, ExcuseReply, FIZZLED_MESSAGE, PERSONA_INSTRUCTION};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use shared::protocol::GenerationConfig;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone)]
struct CapturedRequest {
    model_action: String,
    api_key: Option<String>,
    body: serde_json::Value,
}

#[derive(Clone)]
struct ServerState {
    status: StatusCode,
    body: String,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

async fn generate_handler(
    State(state): State<ServerState>,
    Path(model_action): Path<String>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
    state.captured.lock().await.push(CapturedRequest {
        model_action,
        api_key,
        body,
    });
    (state.status, state.body.clone())
}

async fn spawn_service(
    status: StatusCode,
    body: &str,
) -> (String, Arc<Mutex<Vec<CapturedRequest>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let state = ServerState {
        status,
        body: body.to_string(),
        captured: captured.clone(),
    };
    let app = Router::new()
        .route("/v1beta/models/:model_action", post(generate_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    (format!("http://{addr}"), captured)
}

fn request(prompt: &str) -> GenerationRequest {
    GenerationRequest {
        model: "gemini-2.5-flash".into(),
        system_instruction: PERSONA_INSTRUCTION.into(),
        prompt: prompt.into(),
        config: GenerationConfig {
            temperature: 0.9,
            top_k: 50,
            top_p: 0.95,
        },
    }
}

const OK_BODY: &str = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"A raccoon stole my calendar."}]},"finishReason":"STOP"}]}"#;

#[tokio::test]
async fn posts_generate_content_with_credential_and_body() {
    let (base_url, captured) = spawn_service(StatusCode::OK, OK_BODY).await;
    let backend = GeminiBackend::new(&base_url, "test-key").expect("backend");

    let text = backend
        .generate_content(&request("Generate an excuse for this situation: \"late\""))
        .await
        .expect("generate");
    assert_eq!(text, "A raccoon stole my calendar.");

    let captured = captured.lock().await;
    assert_eq!(captured.len(), 1);
    let seen = &captured[0];
    assert_eq!(seen.model_action, "gemini-2.5-flash:generateContent");
    assert_eq!(seen.api_key.as_deref(), Some("test-key"));
    assert_eq!(
        seen.body["systemInstruction"]["parts"][0]["text"],
        PERSONA_INSTRUCTION
    );
    assert_eq!(
        seen.body["contents"][0]["parts"][0]["text"],
        "Generate an excuse for this situation: \"late\""
    );
    assert_eq!(seen.body["generationConfig"]["topK"], 50);
}

#[tokio::test]
async fn non_success_status_carries_service_message() {
    let (base_url, _) = spawn_service(
        StatusCode::SERVICE_UNAVAILABLE,
        r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#,
    )
    .await;
    let backend = GeminiBackend::new(&base_url, "test-key").expect("backend");

    let err = backend
        .generate_content(&request("prompt"))
        .await
        .expect_err("status error");
    match err {
        GenerationError::Status { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "The model is overloaded.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_reported() {
    let (base_url, _) = spawn_service(StatusCode::OK, "<html>not json</html>").await;
    let backend = GeminiBackend::new(&base_url, "test-key").expect("backend");

    let err = backend
        .generate_content(&request("prompt"))
        .await
        .expect_err("malformed");
    assert!(matches!(err, GenerationError::Malformed(_)));
}

#[tokio::test]
async fn response_without_candidates_is_empty() {
    let (base_url, _) = spawn_service(StatusCode::OK, r#"{"candidates":[]}"#).await;
    let backend = GeminiBackend::new(&base_url, "test-key").expect("backend");

    let err = backend
        .generate_content(&request("prompt"))
        .await
        .expect_err("empty");
    assert!(matches!(err, GenerationError::EmptyResponse));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let backend = GeminiBackend::new(&format!("http://{addr}"), "test-key").expect("backend");
    let err = backend
        .generate_content(&request("prompt"))
        .await
        .expect_err("transport");
    assert!(matches!(err, GenerationError::Transport(_)));
}

#[tokio::test]
async fn client_turns_server_error_into_fallback() {
    let (base_url, captured) =
        spawn_service(StatusCode::INTERNAL_SERVER_ERROR, "internal failure").await;
    let backend = GeminiBackend::new(&base_url, "test-key").expect("backend");
    let client = ExcuseClient::new(
        Arc::new(backend),
        "gemini-2.5-flash",
        GenerationConfig {
            temperature: 0.9,
            top_k: 50,
            top_p: 0.95,
        },
    );

    let reply = client.generate_excuse("Forgot our anniversary").await;
    assert_eq!(reply, ExcuseReply::Fizzled(FIZZLED_MESSAGE.to_string()));
    assert_eq!(captured.lock().await.len(), 1);
}

#[test]
fn endpoint_keeps_base_path_prefix() {
    let backend = GeminiBackend::new("https://proxy.example.com/genai/", "k").expect("backend");
    assert_eq!(
        backend.endpoint("gemini-2.5-flash").as_str(),
        "https://proxy.example.com/genai/v1beta/models/gemini-2.5-flash:generateContent"
    );
}
