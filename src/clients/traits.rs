use async_trait::async_trait;
use serde_json::Value;

use crate::aggregator::CollectedData;
use crate::error::{SynthesisError, ToolError};

/// Something that can execute a named diagnostic tool.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// One attempt, no retries.
    async fn call_tool(&self, tool_method: &str, payload: &Value) -> Result<Value, ToolError>;
}

/// Turns a question plus collected tool data into a natural-language answer.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        question: &str,
        collected: &CollectedData,
    ) -> Result<String, SynthesisError>;
}
