use super::{IndexError, IndexSpec, VectorIndex, VectorRecord};
use crate::config::PineconeConfig;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Largest page the list endpoint serves.
const LIST_PAGE_LIMIT: usize = 100;

/// Serverless Pinecone index addressed through the REST API.
///
/// The index is provisioned lazily: the first data call looks it up by name,
/// creates it when absent, and waits for it to report ready.
pub struct PineconeIndex {
    client: reqwest::Client,
    api_key: Option<String>,
    controller_url: String,
    api_version: String,
    spec: IndexSpec,
    ready_timeout: Duration,
    poll_interval: Duration,
    host: OnceCell<String>,
}

#[derive(Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Deserialize)]
struct IndexDescription {
    name: String,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Deserialize, Default)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Serialize, Deserialize)]
struct WireVector {
    id: String,
    values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    metadata: Value,
}

#[derive(Serialize)]
struct UpsertRequest {
    vectors: Vec<WireVector>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, WireVector>,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    vectors: Vec<ListedId>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct ListedId {
    id: String,
}

#[derive(Deserialize)]
struct Pagination {
    next: Option<String>,
}

impl PineconeIndex {
    pub fn new(config: &PineconeConfig, spec: IndexSpec) -> Result<Self, IndexError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            api_key: config.api_key.clone(),
            controller_url: config.controller_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            spec,
            ready_timeout: Duration::from_secs(config.ready_timeout_secs),
            poll_interval: Duration::from_secs(1),
            host: OnceCell::new(),
        })
    }

    fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, IndexError> {
        let key = self.api_key.as_deref().ok_or(IndexError::MissingApiKey("pinecone"))?;
        Ok(self
            .client
            .request(method, url)
            .header("Api-Key", key)
            .header("X-Pinecone-API-Version", &self.api_version))
    }

    async fn host(&self) -> Result<&str, IndexError> {
        self.host.get_or_try_init(|| self.provision()).await.map(String::as_str)
    }

    async fn provision(&self) -> Result<String, IndexError> {
        let url = format!("{}/indexes", self.controller_url);
        let existing: IndexList = check(self.request(Method::GET, &url)?.send().await?)
            .await?
            .json()
            .await?;

        if existing.indexes.iter().any(|i| i.name == self.spec.name) {
            debug!(index = %self.spec.name, "reusing existing vector index");
        } else {
            info!(
                index = %self.spec.name,
                dimension = self.spec.dimension,
                region = %self.spec.region,
                "creating vector index"
            );
            let body = json!({
                "name": self.spec.name,
                "dimension": self.spec.dimension,
                "metric": self.spec.metric,
                "spec": { "serverless": { "cloud": self.spec.cloud, "region": self.spec.region } },
            });
            let response = self.request(Method::POST, &url)?.json(&body).send().await?;
            // Another process may have created it between list and create.
            if response.status() != StatusCode::CONFLICT {
                check(response).await?;
            }
        }

        self.wait_ready().await
    }

    async fn wait_ready(&self) -> Result<String, IndexError> {
        let url = format!("{}/indexes/{}", self.controller_url, self.spec.name);
        let deadline = Instant::now() + self.ready_timeout;
        loop {
            let description: IndexDescription =
                check(self.request(Method::GET, &url)?.send().await?).await?.json().await?;
            if description.status.ready {
                let host = description
                    .host
                    .filter(|h| !h.is_empty())
                    .ok_or_else(|| IndexError::MissingHost(self.spec.name.clone()))?;
                return Ok(data_plane_url(&host));
            }
            if Instant::now() >= deadline {
                return Err(IndexError::NotReady(self.spec.name.clone()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn data_plane_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{host}")
    }
}

async fn check(response: Response) -> Result<Response, IndexError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IndexError::Status { status: status.as_u16(), body })
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    async fn ensure(&self) -> Result<(), IndexError> {
        self.host().await.map(|_| ())
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, IndexError> {
        if records.is_empty() {
            return Ok(0);
        }
        let url = format!("{}/vectors/upsert", self.host().await?);
        let body = UpsertRequest {
            vectors: records
                .into_iter()
                .map(|r| WireVector { id: r.id, values: r.values, metadata: r.metadata })
                .collect(),
        };
        let response: UpsertResponse =
            check(self.request(Method::POST, &url)?.json(&body).send().await?).await?.json().await?;
        Ok(response.upserted_count)
    }

    async fn fetch(&self, ids: &[String]) -> Result<Vec<VectorRecord>, IndexError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/vectors/fetch", self.host().await?);
        let query: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        let mut response: FetchResponse =
            check(self.request(Method::GET, &url)?.query(&query).send().await?).await?.json().await?;

        Ok(ids
            .iter()
            .filter_map(|id| response.vectors.remove(id))
            .map(|v| VectorRecord { id: v.id, values: v.values, metadata: v.metadata })
            .collect())
    }

    async fn list_ids(&self, limit: usize) -> Result<Vec<String>, IndexError> {
        let url = format!("{}/vectors/list", self.host().await?);
        let mut ids = Vec::new();
        let mut token: Option<String> = None;

        while ids.len() < limit {
            let page_limit = (limit - ids.len()).min(LIST_PAGE_LIMIT).to_string();
            let mut query = vec![("limit", page_limit.as_str())];
            if let Some(t) = token.as_deref() {
                query.push(("paginationToken", t));
            }
            let page: ListResponse =
                check(self.request(Method::GET, &url)?.query(&query).send().await?).await?.json().await?;

            ids.extend(page.vectors.into_iter().map(|v| v.id));
            token = page.pagination.and_then(|p| p.next).filter(|t| !t.is_empty());
            if token.is_none() {
                break;
            }
        }

        ids.truncate(limit);
        Ok(ids)
    }
}
