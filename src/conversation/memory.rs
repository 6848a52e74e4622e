use super::prompts;
use crate::providers::{LanguageModel, RequestError};

/// Conversation memory that keeps a model-written summary instead of the
/// raw transcript.
#[derive(Debug, Default)]
pub struct SummaryMemory {
    buffer: String,
}

impl SummaryMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Ask the model to extend the summary with one human/AI exchange.
    /// The previous summary is kept if the request fails.
    pub async fn record_turn(
        &mut self,
        llm: &dyn LanguageModel,
        human: &str,
        ai: &str,
    ) -> Result<(), RequestError> {
        let new_lines = format!("Human: {human}\nAI: {ai}");
        let summary = llm.complete(&prompts::summarize(&self.buffer, &new_lines)).await?;
        self.buffer = summary.trim().to_string();
        Ok(())
    }
}
