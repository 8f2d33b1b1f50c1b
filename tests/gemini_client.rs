//! Integration tests for the Gemini synthesizer against an in-process fake API.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use cdc_firefighter::aggregator::CollectedData;
use cdc_firefighter::clients::{AnswerSynthesizer, GeminiSynthesizer};
use cdc_firefighter::error::SynthesisError;
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Seen {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

/// Model name decides the reply: `ok`, `blank`, `limited` or `broken`.
async fn fake_gemini(
    State(seen): State<Seen>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("test-key") {
        return (StatusCode::UNAUTHORIZED, "missing key").into_response();
    }
    seen.calls.lock().unwrap().push((call.clone(), body));

    match call.trim_end_matches(":generateContent") {
        "ok" => Json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "  Nenhum erro hoje.\n" }] },
                "finishReason": "STOP"
            }]
        }))
        .into_response(),
        "blank" => Json(json!({ "candidates": [{ "finishReason": "SAFETY" }] })).into_response(),
        "limited" => (StatusCode::TOO_MANY_REQUESTS, "quota exceeded").into_response(),
        _ => (StatusCode::OK, "not json").into_response(),
    }
}

async fn spawn_fake_gemini() -> (String, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/v1beta/models/:call", post(fake_gemini))
        .with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), seen)
}

fn synthesizer(base_url: &str, model: &str, key: &str) -> GeminiSynthesizer {
    GeminiSynthesizer::new(
        key.to_string(),
        model.to_string(),
        base_url.to_string(),
        "English".to_string(),
        5_000,
    )
    .expect("synthesizer")
}

fn collected() -> CollectedData {
    let mut data = CollectedData::new();
    data.insert("rabbitmq.status".into(), json!({ "isConnected": true }));
    data
}

#[tokio::test]
async fn test_answer_text_is_trimmed_and_prompt_sent() {
    let (base, seen) = spawn_fake_gemini().await;
    let answer = synthesizer(&base, "ok", "test-key")
        .synthesize("o rabbit esta ok?", &collected())
        .await
        .unwrap();
    assert_eq!(answer, "Nenhum erro hoje.");

    let calls = seen.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "ok:generateContent");
    let prompt = calls[0].1["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap();
    assert!(prompt.contains("o rabbit esta ok?"));
    assert!(prompt.contains("\"rabbitmq.status\""));
    assert_eq!(calls[0].1["contents"][0]["role"], "user");
}

#[tokio::test]
async fn test_candidate_without_text_is_empty_response() {
    let (base, _) = spawn_fake_gemini().await;
    let err = synthesizer(&base, "blank", "test-key")
        .synthesize("q", &collected())
        .await
        .unwrap_err();
    assert!(matches!(err, SynthesisError::EmptyResponse));
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    let (base, _) = spawn_fake_gemini().await;
    let err = synthesizer(&base, "limited", "test-key")
        .synthesize("q", &collected())
        .await
        .unwrap_err();
    match err {
        SynthesisError::HttpStatus { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "quota exceeded");
        }
        other => panic!("expected http status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_key_is_rejected_upstream() {
    let (base, seen) = spawn_fake_gemini().await;
    let err = synthesizer(&base, "ok", "wrong")
        .synthesize("q", &collected())
        .await
        .unwrap_err();
    assert!(matches!(err, SynthesisError::HttpStatus { status: 401, .. }));
    assert!(seen.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unparseable_body_is_malformed() {
    let (base, _) = spawn_fake_gemini().await;
    let err = synthesizer(&base, "broken", "test-key")
        .synthesize("q", &collected())
        .await
        .unwrap_err();
    assert!(matches!(err, SynthesisError::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_unreachable_api_is_transport_error() {
    let err = synthesizer("http://127.0.0.1:1", "ok", "test-key")
        .synthesize("q", &collected())
        .await
        .unwrap_err();
    assert!(matches!(err, SynthesisError::Transport { .. }));
}
