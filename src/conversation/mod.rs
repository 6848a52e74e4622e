//! Dialogue with the hosted completion model.

pub mod memory;
pub mod prompts;

use crate::providers::{LanguageModel, RequestError};
use memory::SummaryMemory;
use std::sync::Arc;
use tracing::{debug, info};

/// The model input for a question, with stored file text prepended when there is any.
pub fn compose_input(file_content: &str, question: &str) -> String {
    if file_content.is_empty() {
        question.to_string()
    } else {
        format!("Context: {file_content}\nQuestion: {question}")
    }
}

/// A running dialogue. Each turn is answered with the running summary as
/// history, then folded into that summary.
pub struct Conversation {
    llm: Arc<dyn LanguageModel>,
    memory: SummaryMemory,
    turns: usize,
}

impl Conversation {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        info!(model = llm.model_name(), "starting conversation");
        Self { llm, memory: SummaryMemory::new(), turns: 0 }
    }

    pub async fn respond(&mut self, input: &str) -> Result<String, RequestError> {
        let prompt = prompts::conversation(self.memory.buffer(), input);
        let reply = self.llm.complete(&prompt).await?.trim().to_string();
        self.memory.record_turn(self.llm.as_ref(), input, &reply).await?;
        self.turns += 1;
        debug!(turns = self.turns, "conversation turn complete");
        Ok(reply)
    }

    /// The model-maintained summary of every turn so far.
    pub fn summary(&self) -> &str {
        self.memory.buffer()
    }

    pub fn turns(&self) -> usize {
        self.turns
    }
}
