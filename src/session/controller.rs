use super::Session;
use crate::config::{Config, IndexBackend, RecordText};
use crate::conversation::{compose_input, Conversation};
use crate::files::{extract_text, DocumentIndex, ExtractError, UploadedFile};
use crate::notice::Notice;
use crate::providers::{CohereClient, LanguageModel, RequestError};
use crate::vector::{IndexSpec, MemoryIndex, PineconeIndex, VectorIndex};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Event handlers for a session: restore, upload, summarize, and chat submit.
pub struct Controller {
    documents: DocumentIndex,
    llm: Arc<dyn LanguageModel>,
    record_text: RecordText,
}

impl Controller {
    pub fn new(documents: DocumentIndex, llm: Arc<dyn LanguageModel>, record_text: RecordText) -> Self {
        Self { documents, llm, record_text }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let cohere = Arc::new(CohereClient::new(&config.cohere)?);
        let spec = IndexSpec::from(&config.index);
        let index: Arc<dyn VectorIndex> = match config.index.backend {
            IndexBackend::Pinecone => Arc::new(PineconeIndex::new(&config.pinecone, spec)?),
            IndexBackend::Memory => Arc::new(MemoryIndex::new(spec)),
        };
        let documents = DocumentIndex::new(
            index,
            cohere.clone(),
            config.ingest.max_content_chars,
            config.index.restore_limit,
        );
        Ok(Self::new(documents, cohere, config.ingest.record_text))
    }

    pub fn documents(&self) -> &DocumentIndex {
        &self.documents
    }

    /// New session with stored document text restored into it.
    pub async fn start_session(&self) -> (Session, Vec<Notice>) {
        let mut session = Session::new();
        let notices = self.restore(&mut session).await;
        info!(session = %session.id(), "session started");
        (session, notices)
    }

    /// Adopt everything stored in the index as context, unless the session
    /// already has some.
    pub async fn restore(&self, session: &mut Session) -> Vec<Notice> {
        let mut notices = Vec::new();
        if !session.file_content.is_empty() {
            return notices;
        }

        let restored = self.documents.fetch_all(&mut notices).await;
        if restored.is_empty() {
            notices.push(Notice::warning("No stored documents found to restore."));
        } else {
            session.file_content = restored;
            notices.push(Notice::success("Restored file content from the vector index."));
        }
        notices
    }

    /// Extract every file, replace the session context with the combined
    /// text, then store one record per file.
    ///
    /// Per-file failures become error notices and never stop the batch.
    pub async fn upload(&self, session: &mut Session, files: Vec<UploadedFile>) -> Vec<Notice> {
        let mut notices = Vec::new();
        if files.is_empty() {
            return notices;
        }

        let mut extracted: Vec<(String, String)> = Vec::with_capacity(files.len());
        for file in files {
            let name = file.filename.clone();
            session.uploaded_files.push(name.clone());
            match extract(file).await {
                Ok(text) => extracted.push((name, text)),
                Err(message) => {
                    warn!(file = %name, error = %message, "could not extract text");
                    notices.push(Notice::error(message));
                }
            }
        }

        let combined: String = extracted.iter().map(|(_, text)| text.as_str()).collect();
        session.file_content = combined;
        if !extracted.is_empty() {
            notices.push(Notice::success("Files uploaded and processed successfully!"));
        }

        for (name, text) in &extracted {
            let record = match self.record_text {
                RecordText::PerFile => text.as_str(),
                RecordText::Batch => session.file_content.as_str(),
            };
            if record.is_empty() {
                debug!(file = %name, "no text to store");
                continue;
            }
            if let Err(e) = self.documents.upsert(name, record).await {
                error!(file = %name, error = %e, "failed to store document");
                notices.push(Notice::error(format!("Error storing {name}: {e}")));
            }
        }

        notices
    }

    /// The running conversation summary, once a conversation exists.
    pub fn summarize(&self, session: &Session) -> Option<Notice> {
        session
            .conversation
            .as_ref()
            .map(|c| Notice::info(format!("Summary of conversation:\n\n{}", c.summary())))
    }

    /// Answer one chat message. The user text and the reply are appended
    /// together, only once the reply arrived.
    pub async fn submit(&self, session: &mut Session, user_text: &str) -> Result<String, RequestError> {
        let input = compose_input(&session.file_content, user_text);
        let llm = self.llm.clone();
        let conversation = session.conversation.get_or_insert_with(|| Conversation::new(llm));
        let reply = conversation.respond(&input).await?;

        session.messages.push(user_text.to_string());
        session.messages.push(reply.clone());
        Ok(reply)
    }
}

async fn extract(file: UploadedFile) -> Result<String, String> {
    let name = file.filename.clone();
    let result = tokio::task::spawn_blocking(move || extract_text(&file.data, &file.filename)).await;
    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e @ ExtractError::Unsupported(_))) => Err(e.to_string()),
        Ok(Err(e)) => Err(format!("Could not read {name}: {e}")),
        Err(e) => Err(format!("Could not read {name}: {e}")),
    }
}
