//! Hosted model providers.
//!
//! The rest of the crate talks to models only through [`Embedder`] and
//! [`LanguageModel`], so the controller can run against scripted models in
//! tests.

pub mod cohere;

use async_trait::async_trait;
use thiserror::Error;

pub use cohere::CohereClient;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("missing API key for {0}")]
    MissingApiKey(&'static str),
    #[error("provider response contained no {0}")]
    Empty(&'static str),
}

/// Turns text into a single fixed-dimension vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RequestError>;
}

/// A text-in, text-out completion model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, RequestError>;

    fn model_name(&self) -> &str;
}

pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, RequestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RequestError::Status { status: status.as_u16(), body })
}
