use std::time::Instant;

use tracing::{error, info};

use crate::error::{GatewayError, Result};
use crate::routing::route;
use crate::server::{AskResponse, Gateway};

impl Gateway {
    /// Answer one question: route, fan out, synthesize.
    ///
    /// Tool failures are reported inside the response; only a synthesis failure
    /// fails the request.
    pub async fn ask(&self, question: &str) -> Result<AskResponse> {
        if question.trim().is_empty() {
            return Err(GatewayError::Validation {
                message: "question must not be empty".to_string(),
            });
        }

        let start = Instant::now();
        info!("Received question: {}", question);

        let invocations = route(question);
        info!(
            "Tools chosen: {:?}",
            invocations.iter().map(|i| i.name.as_str()).collect::<Vec<_>>()
        );

        let aggregation = self.aggregator.aggregate(invocations).await;
        info!(
            "Collected data from {} tools ({} technical log records)",
            aggregation.collected.len(),
            aggregation.technical_logs.len()
        );

        info!("Calling synthesizer with question and collected data");
        let answer_text = self
            .synthesizer
            .synthesize(question, &aggregation.collected)
            .await
            .map_err(|e| {
                error!("Failed to get answer from synthesizer: {}", e);
                GatewayError::from(e)
            })?;
        info!("Answer received from synthesizer");

        Ok(AskResponse {
            answer_text,
            technical_logs: aggregation.technical_logs,
            tools_used: aggregation.tools_used,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }
}
