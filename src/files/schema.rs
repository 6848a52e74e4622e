use serde::{Deserialize, Serialize};

/// A file received from the upload form, before extraction.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self { filename: filename.into(), data: data.into() }
    }
}

/// Metadata stored alongside each document embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub file_name: String,
    #[serde(default)]
    pub content: String,
}

/// A document record as held by the vector index, keyed by file name.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub file_name: String,
    pub content: String,
    pub embedding: Vec<f32>,
}
