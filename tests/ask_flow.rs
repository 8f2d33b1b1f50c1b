//! End-to-end tests of the ask flow: routing, fan-out, synthesis and the HTTP surface.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cdc_firefighter::aggregator::CollectedData;
use cdc_firefighter::clients::{AnswerSynthesizer, ToolBackend};
use cdc_firefighter::config::Config;
use cdc_firefighter::error::{GatewayError, SynthesisError, ToolError};
use cdc_firefighter::http::build_router;
use cdc_firefighter::prompts::build_answer_prompt;
use cdc_firefighter::server::Gateway;
use serde_json::{Value, json};

/// Log searches succeed; every other tool is unknown.
struct FakeBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl ToolBackend for FakeBackend {
    async fn call_tool(&self, tool_method: &str, payload: &Value) -> Result<Value, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match tool_method {
            "logs.search" => Ok(json!([
                { "message": "insert ok", "size": payload["size"].clone() },
                { "message": "insert failed" }
            ])),
            "rabbit.status" => Ok(json!({ "isConnected": true, "vhost": "/" })),
            other => Err(ToolError::HttpStatus {
                status: 404,
                body: format!("Tool '{other}' not found."),
            }),
        }
    }
}

/// Records the prompt it would send and answers with a fixed text.
struct RecordingSynthesizer {
    answer: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingSynthesizer {
    fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn empty() -> Self {
        Self {
            answer: None,
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AnswerSynthesizer for RecordingSynthesizer {
    async fn synthesize(
        &self,
        question: &str,
        collected: &CollectedData,
    ) -> Result<String, SynthesisError> {
        let prompt = build_answer_prompt(question, collected, "English");
        self.prompts.lock().unwrap().push(prompt);
        match &self.answer {
            Some(text) => Ok(text.trim().to_string()),
            None => Err(SynthesisError::EmptyResponse),
        }
    }
}

fn gateway(synth: Arc<RecordingSynthesizer>) -> (Gateway, Arc<FakeBackend>) {
    let backend = Arc::new(FakeBackend {
        calls: AtomicUsize::new(0),
    });
    let gw = Gateway::with_parts(Config::default(), backend.clone(), synth);
    (gw, backend)
}

async fn serve(gw: Gateway) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(gw)).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_errors_and_quantity_question_dispatches_four_tools() {
    let synth = Arc::new(RecordingSynthesizer::answering("  Hoje tivemos 1 erro.  "));
    let (gw, backend) = gateway(synth.clone());

    let response = gw.ask("quantos erros tivemos hoje?").await.unwrap();

    assert_eq!(response.answer_text, "Hoje tivemos 1 erro.");
    assert_eq!(response.tools_used.len(), 4);
    // errors.summary and logs.recent_errors share a payload, as do the two counts
    assert!(backend.calls.load(Ordering::SeqCst) <= 4);

    let prompts = synth.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    for key in [
        "logs.recent_errors",
        "errors.summary",
        "data.count_today",
        "data.count_by_operation",
    ] {
        assert!(prompts[0].contains(&format!("\"{key}\"")), "missing {key}");
    }
    // Four list results of two records each
    assert_eq!(response.technical_logs.len(), 8);
}

#[tokio::test]
async fn test_failing_tool_is_reported_in_band() {
    let synth = Arc::new(RecordingSynthesizer::answering("ok"));
    let (gw, _) = gateway(synth.clone());

    let response = gw.ask("rabbit e worker estão ok?").await.unwrap();

    assert_eq!(response.tools_used.len(), 2);
    assert!(response.tools_used.contains(&"worker.status".to_string()));
    assert_eq!(
        response.technical_logs,
        vec![json!({ "isConnected": true, "vhost": "/" })]
    );
    let prompt = &synth.prompts.lock().unwrap()[0];
    assert!(prompt.contains("MCP HTTP 404"));
}

#[tokio::test]
async fn test_fallback_question() {
    let synth = Arc::new(RecordingSynthesizer::answering("nada a relatar"));
    let (gw, _) = gateway(synth);

    let response = gw.ask("bom dia").await.unwrap();
    assert_eq!(response.tools_used, vec!["logs.search".to_string()]);
}

#[tokio::test]
async fn test_empty_synthesis_fails_request() {
    let (gw, _) = gateway(Arc::new(RecordingSynthesizer::empty()));
    let err = gw.ask("algum erro?").await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Synthesis(SynthesisError::EmptyResponse)
    ));
}

#[tokio::test]
async fn test_blank_question_rejected() {
    let (gw, backend) = gateway(Arc::new(RecordingSynthesizer::answering("x")));
    let err = gw.ask("   ").await.unwrap_err();
    assert!(matches!(err, GatewayError::Validation { .. }));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_http_ask_on_both_paths() {
    let (gw, _) = gateway(Arc::new(RecordingSynthesizer::answering("resposta")));
    let addr = serve(gw).await;
    let http = reqwest::Client::new();

    for path in ["ask", "perguntar"] {
        let resp = http
            .post(format!("http://{addr}/{path}"))
            .json(&json!({ "pergunta": "status do rabbit" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["resposta_ia"], "resposta");
        assert_eq!(
            body["ferramentas_usadas"].as_array().map(|a| a.len()),
            Some(2)
        );
        assert!(body["logs_tecnicos"].is_array());
        assert!(body["tempo_resposta_ms"].is_u64());
    }
}

#[tokio::test]
async fn test_http_accepts_question_alias() {
    let (gw, _) = gateway(Arc::new(RecordingSynthesizer::answering("ok")));
    let addr = serve(gw).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/ask"))
        .json(&json!({ "question": "cdc listener?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_http_synthesis_failure_is_bad_gateway() {
    let (gw, _) = gateway(Arc::new(RecordingSynthesizer::empty()));
    let addr = serve(gw).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/ask"))
        .json(&json!({ "pergunta": "erro?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("empty response"));
}

#[tokio::test]
async fn test_http_blank_question_is_bad_request() {
    let (gw, _) = gateway(Arc::new(RecordingSynthesizer::answering("x")));
    let addr = serve(gw).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/perguntar"))
        .json(&json!({ "pergunta": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_health_reports_backend_url() {
    let (gw, _) = gateway(Arc::new(RecordingSynthesizer::answering("x")));
    let addr = serve(gw).await;

    let body: Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        body,
        json!({ "status": "ok", "mcp_url": "http://localhost:5184/mcp" })
    );
}

#[tokio::test]
async fn test_http_malformed_body_gets_detail_json() {
    let (gw, backend) = gateway(Arc::new(RecordingSynthesizer::answering("x")));
    let addr = serve(gw).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/ask"))
        .json(&json!({ "texto": "campo errado" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("pergunta"));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}
