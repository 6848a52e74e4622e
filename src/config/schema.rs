use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Top-level `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    pub cohere: CohereConfig,
    pub pinecone: PineconeConfig,
    pub index: IndexConfig,
    pub ingest: IngestConfig,
    pub gateway: GatewayConfig,
    pub session: SessionConfig,
}

/// Embedding and completion service.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CohereConfig {
    /// Overridden by `COHERE_API_KEY`.
    pub api_key: Option<String>,
    pub base_url: String,
    pub embed_model: String,
    pub chat_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Unset leaves the HTTP client's default behavior.
    pub request_timeout_secs: Option<u64>,
}

impl Default for CohereConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.cohere.ai".into(),
            embed_model: "embed-english-v2.0".into(),
            chat_model: "command-xlarge-nightly".into(),
            temperature: 0.0,
            max_tokens: 256,
            request_timeout_secs: None,
        }
    }
}

/// Managed vector index service.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PineconeConfig {
    /// Overridden by `PINECONE_API_KEY`.
    pub api_key: Option<String>,
    pub controller_url: String,
    pub api_version: String,
    /// How long to wait for a freshly created index to report ready.
    pub ready_timeout_secs: u64,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            controller_url: "https://api.pinecone.io".into(),
            api_version: "2024-07".into(),
            ready_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Pinecone,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cosine,
    Euclidean,
    Dotproduct,
}

/// The index documents are stored in. Created on first use when absent.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct IndexConfig {
    pub backend: IndexBackend,
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub cloud: String,
    pub region: String,
    /// Upper bound on records read back when a session restores context.
    pub restore_limit: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Pinecone,
            name: "file-contents".into(),
            dimension: 4096,
            metric: Metric::Cosine,
            cloud: "aws".into(),
            region: "us-east-1".into(),
            restore_limit: 100,
        }
    }
}

/// Which text a file's stored record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecordText {
    /// The file's own extracted text.
    PerFile,
    /// The combined text of the whole upload batch.
    Batch,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct IngestConfig {
    /// Stored content is cut to this many characters.
    pub max_content_chars: usize,
    pub record_text: RecordText,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { max_content_chars: 1_000_000, record_text: RecordText::PerFile }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8501, max_upload_bytes: 50 * 1024 * 1024 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions untouched for this long are dropped.
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { idle_timeout_secs: 3600 }
    }
}
