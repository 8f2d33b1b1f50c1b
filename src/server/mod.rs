//! Gateway service: routing, fan-out and synthesis for one question at a time

use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::aggregator::Aggregator;
use crate::cache::{SharedCache, TtlCache};
use crate::clients::{AnswerSynthesizer, GeminiSynthesizer, McpToolClient, ToolBackend};
use crate::config::Config;

pub mod ask;

/// Body of `POST /ask` and `POST /perguntar`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    #[serde(alias = "question")]
    pub pergunta: String,
}

/// Answer plus the evidence gathered for it. Request-scoped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    #[serde(rename = "resposta_ia")]
    pub answer_text: String,
    #[serde(rename = "logs_tecnicos")]
    pub technical_logs: Vec<Value>,
    #[serde(rename = "ferramentas_usadas")]
    pub tools_used: Vec<String>,
    #[serde(rename = "tempo_resposta_ms")]
    pub elapsed_ms: u64,
}

/// Main gateway implementation
#[derive(Clone)]
pub struct Gateway {
    pub config: Arc<Config>,
    pub aggregator: Aggregator,
    pub synthesizer: Arc<dyn AnswerSynthesizer>,
}

impl Gateway {
    /// Wire the MCP client, Gemini adapter and cache from configuration.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.require_api_key()?.to_string();

        let backend = McpToolClient::new(
            config.mcp.server_url.clone(),
            config.mcp.timeout_ms,
            config.mcp.accept_invalid_certs,
        )
        .context("Failed to create MCP client")?;

        let synthesizer = GeminiSynthesizer::new(
            api_key,
            config.synthesis.model.clone(),
            config.synthesis.base_url.clone(),
            config.synthesis.answer_language.clone(),
            config.synthesis.timeout_ms,
        )
        .context("Failed to create Gemini synthesizer")?;

        info!(
            "Gateway initialized (mcp={}, model={}, cache_enabled={}, ttl={}s, max_items={})",
            config.mcp.server_url,
            config.synthesis.model,
            config.cache.enabled,
            config.cache.ttl_seconds,
            config.cache.max_items
        );

        Ok(Self::with_parts(
            config.clone(),
            Arc::new(backend),
            Arc::new(synthesizer),
        ))
    }

    /// Build from already-constructed collaborators; the cache still follows `config`.
    pub fn with_parts(
        config: Config,
        backend: Arc<dyn ToolBackend>,
        synthesizer: Arc<dyn AnswerSynthesizer>,
    ) -> Self {
        let cache: Option<SharedCache> = config
            .cache
            .enabled
            .then(|| TtlCache::shared(config.cache.ttl_seconds, config.cache.max_items));
        Self {
            config: Arc::new(config),
            aggregator: Aggregator::new(backend, cache),
            synthesizer,
        }
    }

    /// URL reported by the liveness probe
    pub fn tool_backend_url(&self) -> &str {
        &self.config.mcp.server_url
    }
}
