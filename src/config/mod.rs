mod schema;

pub use schema::{
    CohereConfig, Config, GatewayConfig, IndexBackend, IndexConfig, IngestConfig, Metric,
    PineconeConfig, RecordText, SessionConfig,
};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const COHERE_KEY_VARS: [&str; 2] = ["COHERE_API_KEY", "YOUR_COHERE_API_KEY"];
const PINECONE_KEY_VARS: [&str; 2] = ["PINECONE_API_KEY", "YOUR_PINECONE_API_KEY"];

impl Config {
    /// `<platform config dir>/filechat/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "filechat").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from an explicit path (which must exist) or the default location
    /// (which may not), then apply secrets from the environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(Path::new(&shellexpand::tilde(p).to_string()))?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => {
                    info!("no config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        config.warn_missing_secrets();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |vars: &[&str]| vars.iter().find_map(|v| lookup(v).filter(|s| !s.is_empty()));
        if let Some(key) = first(&COHERE_KEY_VARS) {
            self.cohere.api_key = Some(key);
        }
        if let Some(key) = first(&PINECONE_KEY_VARS) {
            self.pinecone.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.index.dimension == 0 {
            bail!("index.dimension must be greater than zero");
        }
        if self.index.restore_limit == 0 {
            bail!("index.restore_limit must be greater than zero");
        }
        if self.ingest.max_content_chars == 0 {
            bail!("ingest.max_content_chars must be greater than zero");
        }
        if !(0.0..=5.0).contains(&self.cohere.temperature) {
            bail!("cohere.temperature must be within 0.0..=5.0");
        }
        Ok(())
    }

    // Missing keys only fail the first call that needs them.
    fn warn_missing_secrets(&self) {
        if self.cohere.api_key.is_none() {
            warn!("no Cohere API key configured (set COHERE_API_KEY)");
        }
        if self.index.backend == IndexBackend::Pinecone && self.pinecone.api_key.is_none() {
            warn!("no Pinecone API key configured (set PINECONE_API_KEY)");
        }
    }

    /// JSON Schema of the config file, for editor tooling.
    pub fn json_schema() -> Result<String> {
        Ok(serde_json::to_string_pretty(&schemars::schema_for!(Config))?)
    }
}
