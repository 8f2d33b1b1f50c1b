//! HTTP client for the MCP tool-execution backend
//!
//! Sends `{"tool": ..., "payload": ...}` to a single endpoint and interprets the
//! `{success, error, data}` response envelope.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::{debug, error};

use crate::clients::traits::ToolBackend;
use crate::error::ToolError;

const BODY_PREVIEW_CHARS: usize = 200;
const GENERIC_ERROR_MESSAGE: &str = "Unknown MCP error";

pub struct McpToolClient {
    client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

impl McpToolClient {
    pub fn new(base_url: String, timeout_ms: u64, accept_invalid_certs: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .context("Failed to build reqwest client with timeout")?;
        Ok(Self {
            client,
            base_url,
            timeout_ms,
        })
    }

    fn classify(&self, err: reqwest::Error) -> ToolError {
        if err.is_timeout() {
            error!("Timeout calling MCP: {}", err);
            ToolError::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else if err.is_connect() {
            error!("Connection error to MCP ({}): {}", self.base_url, err);
            ToolError::Connect {
                url: self.base_url.clone(),
                message: err.to_string(),
            }
        } else {
            error!("Error calling MCP: {}", err);
            ToolError::Request {
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl ToolBackend for McpToolClient {
    async fn call_tool(&self, tool_method: &str, payload: &Value) -> Result<Value, ToolError> {
        let body = json!({ "tool": tool_method, "payload": payload });
        debug!("Sending MCP request to {}: {}", self.base_url, body);

        let response = self
            .client
            .post(&self.base_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.classify(e))?;
        debug!(
            "MCP response received: status={}, body={}",
            status,
            preview(&text, 500)
        );

        if !status.is_success() {
            error!("MCP returned HTTP status {}: {}", status, text);
            return Err(ToolError::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let value: Value = serde_json::from_str(&text).map_err(|_| {
            error!("Invalid MCP response: {}", text);
            ToolError::MalformedBody {
                body: preview(&text, BODY_PREVIEW_CHARS),
            }
        })?;

        let result = interpret_envelope(value);
        match &result {
            Ok(data) => debug!(
                "MCP result for {}: {}",
                tool_method,
                preview(&data.to_string(), BODY_PREVIEW_CHARS)
            ),
            Err(err) => error!("MCP error ({}): {}", tool_method, err),
        }
        result
    }
}

/// Unwrap a `{success, error, data}` envelope into its result payload.
///
/// Objects without `data` are returned whole; non-object bodies pass through.
pub fn interpret_envelope(value: Value) -> Result<Value, ToolError> {
    let mut map = match value {
        Value::Object(map) => map,
        other => return Ok(other),
    };

    let success = map.get("success").map(is_truthy).unwrap_or(true);
    let has_error = map.get("error").is_some_and(|e| !e.is_null());
    if !success || has_error {
        return Err(ToolError::Application {
            message: envelope_error_message(&map),
        });
    }

    match map.remove("data") {
        Some(data) => Ok(data),
        None => Ok(Value::Object(map)),
    }
}

fn envelope_error_message(map: &Map<String, Value>) -> String {
    match map.get("error") {
        Some(Value::Object(obj)) if !obj.is_empty() => obj
            .get("message")
            .map(message_text)
            .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
        Some(err) if is_truthy(err) => message_text(err),
        _ => map
            .get("message")
            .map(message_text)
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
    }
}

fn message_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JSON truthiness: null, false, zero and empty containers are false
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
