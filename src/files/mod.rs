//! Uploaded documents: text extraction and storage in the vector index.

pub mod extract;
pub mod index;
pub mod schema;

pub use extract::{extract_text, DocumentFormat, ExtractError};
pub use index::{DocumentIndex, StoreError};
pub use schema::{DocumentMetadata, StoredDocument, UploadedFile};
