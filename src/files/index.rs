use super::schema::{DocumentMetadata, StoredDocument};
use crate::notice::Notice;
use crate::providers::{Embedder, RequestError};
use crate::vector::{IndexError, VectorIndex, VectorRecord};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("embedding request failed: {0}")]
    Embedding(#[from] RequestError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Stores uploaded document text in the vector index, one record per file
/// name, and reads it back when a session starts.
pub struct DocumentIndex {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    max_content_chars: usize,
    restore_limit: usize,
}

impl DocumentIndex {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        max_content_chars: usize,
        restore_limit: usize,
    ) -> Self {
        Self { index, embedder, max_content_chars, restore_limit }
    }

    /// Create the index if it does not exist yet.
    pub async fn provision(&self) -> Result<(), IndexError> {
        self.index.ensure().await
    }

    /// Embed `text` and write it under `file_name`, replacing any earlier record.
    pub async fn upsert(&self, file_name: &str, text: &str) -> Result<(), StoreError> {
        let embedding = self.embedder.embed(text).await?;
        let content = truncate_chars(text, self.max_content_chars);
        let record = VectorRecord {
            id: file_name.to_string(),
            values: embedding,
            metadata: json!({ "file_name": file_name, "content": content }),
        };
        self.index.upsert(vec![record]).await?;
        info!(file = file_name, chars = content.chars().count(), "stored document");
        Ok(())
    }

    pub async fn get(&self, file_name: &str) -> Result<Option<StoredDocument>, IndexError> {
        let mut records = self.index.fetch(&[file_name.to_string()]).await?;
        Ok(records.pop().map(|record| {
            let metadata = match serde_json::from_value::<DocumentMetadata>(record.metadata) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(id = %record.id, error = %e, "stored record has malformed metadata");
                    DocumentMetadata { file_name: record.id.clone(), content: String::new() }
                }
            };
            StoredDocument {
                file_name: metadata.file_name,
                content: metadata.content,
                embedding: record.values,
            }
        }))
    }

    /// Concatenated content of every stored record, up to the restore limit,
    /// in the index's listing order.
    ///
    /// A failed read is reported as an error notice and yields empty text.
    pub async fn fetch_all(&self, notices: &mut Vec<Notice>) -> String {
        match self.read_all().await {
            Ok(content) => content,
            Err(e) => {
                error!(error = %e, "failed to read stored documents");
                notices.push(Notice::error(format!("Error fetching stored documents: {e}")));
                String::new()
            }
        }
    }

    async fn read_all(&self) -> Result<String, IndexError> {
        let ids = self.index.list_ids(self.restore_limit).await?;
        let records = self.index.fetch(&ids).await?;
        debug!(records = records.len(), "read stored documents");
        Ok(records
            .iter()
            .filter_map(|r| r.metadata.get("content").and_then(|c| c.as_str()))
            .collect())
    }
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
