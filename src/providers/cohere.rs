use super::{check_status, Embedder, LanguageModel, RequestError};
use crate::config::CohereConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Client for the Cohere `embed` and `generate` endpoints.
pub struct CohereClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    embed_model: String,
    chat_model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: [&'a str; 1],
    model: &'a str,
    truncate: &'static str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    generations: Vec<Generation>,
}

#[derive(Deserialize)]
struct Generation {
    text: String,
}

impl CohereClient {
    pub fn new(config: &CohereConfig) -> Result<Self, RequestError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            embed_model: config.embed_model.clone(),
            chat_model: config.chat_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn post(&self, path: &str) -> Result<reqwest::RequestBuilder, RequestError> {
        let key = self.api_key.as_deref().ok_or(RequestError::MissingApiKey("cohere"))?;
        Ok(self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(key))
    }
}

#[async_trait]
impl Embedder for CohereClient {
    /// One embedding per call; over-long input is truncated from the end.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RequestError> {
        let body = EmbedRequest { texts: [text], model: &self.embed_model, truncate: "END" };
        debug!(model = %self.embed_model, chars = text.len(), "requesting embedding");
        let response = check_status(self.post("/v1/embed")?.json(&body).send().await?).await?;
        let parsed: EmbedResponse = response.json().await?;
        parsed.embeddings.into_iter().next().ok_or(RequestError::Empty("embeddings"))
    }
}

#[async_trait]
impl LanguageModel for CohereClient {
    async fn complete(&self, prompt: &str) -> Result<String, RequestError> {
        let body = GenerateRequest {
            model: &self.chat_model,
            prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        debug!(model = %self.chat_model, chars = prompt.len(), "requesting completion");
        let response = check_status(self.post("/v1/generate")?.json(&body).send().await?).await?;
        let parsed: GenerateResponse = response.json().await?;
        parsed
            .generations
            .into_iter()
            .next()
            .map(|g| g.text)
            .ok_or(RequestError::Empty("generations"))
    }

    fn model_name(&self) -> &str {
        &self.chat_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;

    type Seen = Arc<Mutex<Vec<(String, Value)>>>;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}")
    }

    fn stub(seen: Seen, embeddings: Value) -> Router {
        let embed_seen = seen.clone();
        Router::new()
            .route(
                "/v1/embed",
                post(move |headers: HeaderMap, Json(body): Json<Value>| {
                    let seen = embed_seen.clone();
                    let embeddings = embeddings.clone();
                    async move {
                        let auth = headers["authorization"].to_str().unwrap().to_string();
                        seen.lock().push((auth, body));
                        Json(json!({ "id": "e1", "embeddings": embeddings }))
                    }
                }),
            )
            .route(
                "/v1/generate",
                post(move |headers: HeaderMap, Json(body): Json<Value>| {
                    let seen = seen.clone();
                    async move {
                        let auth = headers["authorization"].to_str().unwrap().to_string();
                        seen.lock().push((auth, body));
                        Json(json!({ "generations": [{ "id": "g1", "text": " Paris." }] }))
                    }
                }),
            )
    }

    fn client(base_url: String, api_key: Option<&str>) -> CohereClient {
        let config = CohereConfig {
            api_key: api_key.map(str::to_string),
            base_url,
            ..CohereConfig::default()
        };
        CohereClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn embed_sends_single_text_with_end_truncation() {
        let seen: Seen = Arc::default();
        let base = spawn(stub(seen.clone(), json!([[0.5, -0.25, 1.0]]))).await;
        let vector = client(base, Some("k-123")).embed("hello").await.unwrap();
        assert_eq!(vector, vec![0.5, -0.25, 1.0]);

        let seen = seen.lock();
        assert_eq!(seen[0].0, "Bearer k-123");
        assert_eq!(
            seen[0].1,
            json!({ "texts": ["hello"], "model": "embed-english-v2.0", "truncate": "END" })
        );
    }

    #[tokio::test]
    async fn zero_embeddings_is_an_error() {
        let base = spawn(stub(Arc::default(), json!([]))).await;
        let err = client(base, Some("k")).embed("hello").await.unwrap_err();
        assert!(matches!(err, RequestError::Empty("embeddings")));
    }

    #[tokio::test]
    async fn generate_uses_configured_model_and_temperature() {
        let seen: Seen = Arc::default();
        let base = spawn(stub(seen.clone(), json!([]))).await;
        let reply = client(base, Some("k")).complete("Capital of France?").await.unwrap();
        assert_eq!(reply, " Paris.");

        let body = &seen.lock()[0].1;
        assert_eq!(body["model"], "command-xlarge-nightly");
        assert_eq!(body["prompt"], "Capital of France?");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["max_tokens"], 256);
    }

    #[tokio::test]
    async fn error_status_carries_response_body() {
        let router = Router::new().route(
            "/v1/embed",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = spawn(router).await;
        match client(base, Some("k")).embed("x").await.unwrap_err() {
            RequestError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let err = client("http://127.0.0.1:9".into(), None).embed("x").await.unwrap_err();
        assert!(matches!(err, RequestError::MissingApiKey("cohere")));
    }
}
