//! Remote vector index contract and its backends.

pub mod memory;
pub mod pinecone;

use crate::config::{IndexConfig, Metric};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryIndex;
pub use pinecone::PineconeIndex;

/// What the index should look like when it has to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub cloud: String,
    pub region: String,
}

impl From<&IndexConfig> for IndexSpec {
    fn from(config: &IndexConfig) -> Self {
        Self {
            name: config.name.clone(),
            dimension: config.dimension,
            metric: config.metric,
            cloud: config.cloud.clone(),
            region: config.region.clone(),
        }
    }
}

/// One vector with its id and JSON metadata object.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Value,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector index request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("vector index returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("missing API key for {0}")]
    MissingApiKey(&'static str),
    #[error("vector for `{id}` has dimension {actual}, index expects {expected}")]
    DimensionMismatch { id: String, expected: usize, actual: usize },
    #[error("index `{0}` did not become ready in time")]
    NotReady(String),
    #[error("vector index response had no host for `{0}`")]
    MissingHost(String),
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn spec(&self) -> &IndexSpec;

    /// Make sure the index exists, creating it from [`IndexSpec`] when absent.
    /// An existing index is reused as-is.
    async fn ensure(&self) -> Result<(), IndexError>;

    /// Insert or overwrite records by id. Returns the number written.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, IndexError>;

    /// Records for the given ids, in the order asked for. Unknown ids are skipped.
    async fn fetch(&self, ids: &[String]) -> Result<Vec<VectorRecord>, IndexError>;

    /// Up to `limit` record ids, in the index's listing order.
    async fn list_ids(&self, limit: usize) -> Result<Vec<String>, IndexError>;
}
