mod docai;
mod openai;

pub use docai::{DocAiClient, ExtractionError};
pub use openai::{DocumentAnalysis, LlmError, OpenAiAgent};
