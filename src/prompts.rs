//! Prompt construction for answer synthesis

use crate::aggregator::CollectedData;

pub const DEFAULT_ANSWER_LANGUAGE: &str = "Brazilian Portuguese";

/// Build the synthesis prompt for a question and the data collected for it.
///
/// Output is deterministic: collected data is serialized with sorted keys.
pub fn build_answer_prompt(question: &str, collected: &CollectedData, language: &str) -> String {
    let data = serde_json::to_string_pretty(collected).unwrap_or_else(|_| "{}".to_string());
    format!(
        "You are a monitoring assistant for a change-data-capture pipeline: a .NET API \
         publishes database changes to RabbitMQ and its logs are indexed in OpenSearch. \
         The data below was collected from the MCP server.\n\
         Answer in {language}, clearly and in a friendly tone, always presenting concise \
         evidence taken from the collected data. If something is empty or missing, say so \
         explicitly. Always present the technical logs that were collected.\n\n\
         User question: {question}\n\n\
         Collected data (JSON):\n{data}\n\n\
         Return only the final answer text, without JSON."
    )
}
