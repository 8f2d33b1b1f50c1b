pub mod gemini;
pub mod mcp;
pub mod traits;

pub use gemini::GeminiSynthesizer;
pub use mcp::McpToolClient;
pub use traits::{AnswerSynthesizer, ToolBackend};
