//! Scripted providers and indexes shared by unit tests.

use crate::config::Metric;
use crate::conversation::prompts;
use crate::providers::{Embedder, LanguageModel, RequestError};
use crate::vector::{IndexError, IndexSpec, MemoryIndex, VectorIndex, VectorRecord};
use async_trait::async_trait;
use parking_lot::Mutex;

pub fn spec(dimension: usize) -> IndexSpec {
    IndexSpec {
        name: "file-contents".into(),
        dimension,
        metric: Metric::Cosine,
        cloud: "aws".into(),
        region: "us-east-1".into(),
    }
}

pub fn memory_index(dimension: usize) -> MemoryIndex {
    MemoryIndex::new(spec(dimension))
}

/// Returns a constant vector of the given dimension, or fails every call.
pub struct FixedEmbedder {
    dimension: usize,
    fail: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FixedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension, fail: false, calls: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { dimension: 0, fail: true, calls: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RequestError> {
        self.calls.lock().push(text.to_string());
        if self.fail {
            return Err(RequestError::Status { status: 503, body: "embed unavailable".into() });
        }
        Ok(vec![0.5; self.dimension])
    }
}

/// Answers conversation prompts with a fixed reply and summary prompts with
/// `summary #n`. Every prompt is recorded.
pub struct ScriptedModel {
    reply: String,
    fail: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into(), fail: false, prompts: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { reply: String::new(), fail: true, prompts: Mutex::new(Vec::new()) }
    }

    pub fn conversation_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .iter()
            .filter(|p| !p.starts_with(prompts::SUMMARIZER_PREAMBLE))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, RequestError> {
        let mut seen = self.prompts.lock();
        seen.push(prompt.to_string());
        if self.fail {
            return Err(RequestError::Status { status: 500, body: "model unavailable".into() });
        }
        if prompt.starts_with(prompts::SUMMARIZER_PREAMBLE) {
            let n = seen.iter().filter(|p| p.starts_with(prompts::SUMMARIZER_PREAMBLE)).count();
            return Ok(format!(" summary #{n}\n"));
        }
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// An index whose every call fails.
pub struct FailingIndex {
    spec: IndexSpec,
}

impl FailingIndex {
    pub fn new(dimension: usize) -> Self {
        Self { spec: spec(dimension) }
    }

    fn error() -> IndexError {
        IndexError::Status { status: 503, body: "index unavailable".into() }
    }
}

#[async_trait]
impl VectorIndex for FailingIndex {
    fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    async fn ensure(&self) -> Result<(), IndexError> {
        Err(Self::error())
    }

    async fn upsert(&self, _records: Vec<VectorRecord>) -> Result<usize, IndexError> {
        Err(Self::error())
    }

    async fn fetch(&self, _ids: &[String]) -> Result<Vec<VectorRecord>, IndexError> {
        Err(Self::error())
    }

    async fn list_ids(&self, _limit: usize) -> Result<Vec<String>, IndexError> {
        Err(Self::error())
    }
}
