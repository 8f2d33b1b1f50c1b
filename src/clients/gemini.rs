//! Gemini REST adapter for answer synthesis

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::aggregator::CollectedData;
use crate::clients::traits::AnswerSynthesizer;
use crate::error::SynthesisError;
use crate::prompts::build_answer_prompt;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiSynthesizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    answer_language: String,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, trimmed. `None` when there is no text.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let joined: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl GeminiSynthesizer {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        answer_language: String,
        timeout_ms: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("Failed to build reqwest client with timeout")?;
        Ok(Self {
            client,
            api_key,
            model,
            base_url,
            answer_language,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl AnswerSynthesizer for GeminiSynthesizer {
    async fn synthesize(
        &self,
        question: &str,
        collected: &CollectedData,
    ) -> Result<String, SynthesisError> {
        let prompt = build_answer_prompt(question, collected, &self.answer_language);
        debug!("Calling Gemini with model: {}", self.model);
        debug!(
            "Prompt (first 500 chars): {}",
            prompt.chars().take(500).collect::<String>()
        );

        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: &prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SynthesisError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            error!("Gemini returned HTTP {}: {}", status, body_text);
            return Err(SynthesisError::HttpStatus {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let parsed: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| SynthesisError::MalformedResponse {
                    message: e.to_string(),
                })?;

        match parsed.text() {
            Some(text) => {
                debug!(
                    "Gemini answer received: {}",
                    text.chars().take(200).collect::<String>()
                );
                Ok(text)
            }
            None => {
                let finish = parsed
                    .candidates
                    .first()
                    .and_then(|c| c.finish_reason.clone())
                    .unwrap_or_else(|| "none".to_string());
                error!(
                    "Gemini response without text ({} candidates, finish reason {})",
                    parsed.candidates.len(),
                    finish
                );
                Err(SynthesisError::EmptyResponse)
            }
        }
    }
}
