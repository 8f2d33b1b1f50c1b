//! Concurrent fan-out of tool invocations with per-call failure isolation
//!
//! Each invocation runs in its own task and hands back an immutable
//! `(name, outcome)` pair. Pairs are merged one at a time after the join, so no
//! task ever touches a shared collection. The only shared state is the cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use serde_json::{Map, Value, json};
use tracing::{Instrument, debug, error, info};

use crate::cache::SharedCache;
use crate::clients::traits::ToolBackend;
use crate::error::ToolError;
use crate::routing::Invocation;

/// Invocation name → result payload or `{"error": message}` marker
pub type CollectedData = BTreeMap<String, Value>;

/// Shape of one invocation's result after the join.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    List(Vec<Value>),
    Object(Map<String, Value>),
    Scalar(Value),
    Error(String),
}

impl ToolOutcome {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => ToolOutcome::List(items),
            Value::Object(map) => ToolOutcome::Object(map),
            other => ToolOutcome::Scalar(other),
        }
    }

    /// Split into the value stored in `CollectedData` and the log records it contributes.
    pub fn into_parts(self) -> (Value, Vec<Value>) {
        match self {
            ToolOutcome::List(items) => (Value::Array(items.clone()), items),
            ToolOutcome::Object(map) => {
                let value = Value::Object(map);
                (value.clone(), vec![value])
            }
            ToolOutcome::Scalar(value) => (value, Vec::new()),
            ToolOutcome::Error(message) => (json!({ "error": message }), Vec::new()),
        }
    }
}

/// Merged result of one fan-out pass
#[derive(Debug, Default, Clone)]
pub struct Aggregation {
    pub collected: CollectedData,
    pub technical_logs: Vec<Value>,
    /// Names in completion order, failures included
    pub tools_used: Vec<String>,
}

impl Aggregation {
    /// Last write wins when two invocations share a name.
    fn record(&mut self, name: String, outcome: ToolOutcome) {
        let (value, logs) = outcome.into_parts();
        self.technical_logs.extend(logs);
        self.collected.insert(name.clone(), value);
        self.tools_used.push(name);
    }
}

/// Deterministic cache key for a tool call. Object keys serialize sorted.
pub fn cache_key(tool_method: &str, payload: &Value) -> String {
    format!("{tool_method}:{payload}")
}

#[derive(Clone)]
pub struct Aggregator {
    backend: Arc<dyn ToolBackend>,
    /// `None` disables caching
    cache: Option<SharedCache>,
}

impl Aggregator {
    pub fn new(backend: Arc<dyn ToolBackend>, cache: Option<SharedCache>) -> Self {
        Self { backend, cache }
    }

    /// Cache-wrapped single call.
    pub async fn call(&self, invocation: &Invocation) -> Result<Value, ToolError> {
        call_with_cache(&self.backend, self.cache.as_ref(), invocation).await
    }

    /// Run every invocation concurrently and wait for all of them.
    pub async fn aggregate(&self, invocations: Vec<Invocation>) -> Aggregation {
        let mut pending = FuturesUnordered::new();

        for invocation in invocations {
            let backend = self.backend.clone();
            let cache = self.cache.clone();
            let name = invocation.name.clone();
            let task = tokio::spawn(
                async move {
                    info!(
                        "Calling MCP tool {} ({}) with payload {}",
                        invocation.name, invocation.tool_method, invocation.payload
                    );
                    call_with_cache(&backend, cache.as_ref(), &invocation).await
                }
                .in_current_span(),
            );
            pending.push(async move { (name, task.await) });
        }

        let mut aggregation = Aggregation::default();
        while let Some((name, joined)) = pending.next().await {
            let outcome = match joined {
                Ok(Ok(value)) => {
                    info!("Response from tool {} received", name);
                    ToolOutcome::from_value(value)
                }
                Ok(Err(err)) => {
                    error!("Error executing {}: {}", name, err);
                    ToolOutcome::Error(err.to_string())
                }
                Err(join_err) => {
                    error!("Unexpected error executing {}: {}", name, join_err);
                    ToolOutcome::Error(format!("Unexpected error: {join_err}"))
                }
            };
            aggregation.record(name, outcome);
        }
        aggregation
    }
}

async fn call_with_cache(
    backend: &Arc<dyn ToolBackend>,
    cache: Option<&SharedCache>,
    invocation: &Invocation,
) -> Result<Value, ToolError> {
    let key = cache_key(&invocation.tool_method, &invocation.payload);

    if let Some(cache) = cache {
        if let Some(hit) = cache.lock().await.get(&key) {
            debug!("Cache hit for {}", key);
            return Ok(hit);
        }
    }

    let result = backend
        .call_tool(&invocation.tool_method, &invocation.payload)
        .await?;

    if let Some(cache) = cache {
        cache.lock().await.set(key, result.clone());
    }
    Ok(result)
}
