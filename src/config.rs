use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::clients::gemini::DEFAULT_BASE_URL;
use crate::prompts::DEFAULT_ANSWER_LANGUAGE;

/// Main configuration structure loaded from firefighter.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub synthesis: SynthesisConfig,
    pub mcp: McpConfig,
    pub cache: CacheConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Answer-synthesis (Gemini) settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SynthesisConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_ms: u64,
    pub answer_language: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 60_000,
            answer_language: DEFAULT_ANSWER_LANGUAGE.to_string(),
        }
    }
}

/// Tool-execution backend settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct McpConfig {
    pub server_url: String,
    pub timeout_ms: u64,
    /// Accept self-signed certificates (local development only)
    pub accept_invalid_certs: bool,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5184/mcp".to_string(),
            timeout_ms: 10_000,
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: i64,
    pub max_items: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 60,
            max_items: 200,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub http_bind: SocketAddr,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            http_bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            log_level: "cdc_firefighter=info,tower_http=info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses FIREFIGHTER_CONFIG or defaults to "firefighter.toml"
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(None)
    }

    /// Same as [`Config::load`] with an explicit TOML path taking precedence.
    pub fn load_from(path: Option<&Path>) -> anyhow::Result<Self> {
        if let Ok(env_path) = std::env::var("FIREFIGHTER_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::dotenv();
        }

        let config_path = path.map(Path::to_path_buf).unwrap_or_else(|| {
            PathBuf::from(
                std::env::var("FIREFIGHTER_CONFIG")
                    .unwrap_or_else(|_| "firefighter.toml".to_string()),
            )
        });

        let mut config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            Self::from_toml_str(&content)?
        } else {
            tracing::warn!(
                "Config file {} not found, using defaults",
                config_path.display()
            );
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment-style overrides; `lookup` returns the value for a variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.synthesis.api_key = Some(key);
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.synthesis.model = model;
        }
        if let Some(base) = lookup("GEMINI_BASE_URL") {
            self.synthesis.base_url = base;
        }
        if let Some(ms) = parse_var(&lookup, "SYNTHESIS_TIMEOUT_MS") {
            self.synthesis.timeout_ms = ms;
        }
        if let Some(language) = lookup("ANSWER_LANGUAGE") {
            self.synthesis.answer_language = language;
        }

        if let Some(url) = lookup("MCP_SERVER_URL") {
            self.mcp.server_url = url;
        }
        if let Some(ms) = parse_var(&lookup, "MCP_TIMEOUT_MS") {
            self.mcp.timeout_ms = ms;
        }
        if let Some(allow) = parse_flag(&lookup, "MCP_ACCEPT_INVALID_CERTS") {
            self.mcp.accept_invalid_certs = allow;
        }

        if let Some(ttl) = parse_var(&lookup, "CACHE_TTL_SECONDS") {
            self.cache.ttl_seconds = ttl;
        }
        if let Some(enabled) = parse_flag(&lookup, "CACHE_ENABLED") {
            self.cache.enabled = enabled;
        }
        if let Some(max) = parse_var(&lookup, "CACHE_MAX_ITEMS") {
            self.cache.max_items = max;
        }

        if let Some(bind) = parse_var(&lookup, "FIREFIGHTER_HTTP_BIND") {
            self.runtime.http_bind = bind;
        }
        if let Some(level) = lookup("RUST_LOG") {
            self.runtime.log_level = level;
        }
    }

    pub fn validate(&mut self) -> anyhow::Result<()> {
        if !self.mcp.server_url.starts_with("http://") && !self.mcp.server_url.starts_with("https://")
        {
            anyhow::bail!(
                "MCP server URL '{}' must start with http:// or https://",
                self.mcp.server_url
            );
        }
        if self.cache.max_items == 0 {
            tracing::warn!("cache max_items 0 is not usable, clamping to 1");
            self.cache.max_items = 1;
        }
        if self.cache.enabled && self.cache.ttl_seconds <= 0 {
            tracing::warn!(
                "cache TTL {}s makes every entry stale immediately",
                self.cache.ttl_seconds
            );
        }
        if self.mcp.timeout_ms == 0 {
            anyhow::bail!("MCP_TIMEOUT_MS must be greater than 0");
        }
        if self.synthesis.timeout_ms == 0 {
            anyhow::bail!("SYNTHESIS_TIMEOUT_MS must be greater than 0");
        }
        Ok(())
    }

    /// The synthesis credential, required to start the server.
    pub fn require_api_key(&self) -> anyhow::Result<&str> {
        self.synthesis
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY is not configured"))
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}={}", key, raw);
            None
        }
    }
}

fn parse_flag<F>(lookup: &F, key: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!("Ignoring unparseable {}={}", key, raw);
            None
        }
    }
}
