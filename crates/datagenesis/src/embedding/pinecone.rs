//! Pinecone data-plane client.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::config::{Secret, Settings};
use crate::error::{GenesisError, Result};

use super::EMBEDDING_DIMENSION;
use super::index::{
    Condition, MetadataFilter, QueryMatch, QueryRequest, VectorIndex, VectorRecord,
};

/// Pinecone index reached through its REST data plane.
///
/// `host` is the index host shown in the Pinecone console, e.g.
/// `datagenesis-embeddings-abc123.svc.us-west1-gcp.pinecone.io`.
pub struct PineconeIndex {
    client: Client,
    host: String,
    api_key: Secret,
    dimension: usize,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

/// Largest page `/vectors/list` returns.
const LIST_PAGE_SIZE: usize = 100;

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    vectors: Vec<ListedVector>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct ListedVector {
    id: String,
}

#[derive(Deserialize)]
struct Pagination {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, FetchedVector>,
}

#[derive(Deserialize)]
struct FetchedVector {
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

impl PineconeIndex {
    pub fn new(host: &str, api_key: impl Into<Secret>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(GenesisError::Config("Pinecone API key not configured".to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenesisError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            host: normalize_host(host),
            api_key,
            dimension: EMBEDDING_DIMENSION,
        })
    }

    /// Build from `PINECONE_API_KEY` and `PINECONE_HOST`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings
            .pinecone_api_key
            .clone()
            .ok_or_else(|| GenesisError::Config("PINECONE_API_KEY not set".to_string()))?;
        let host = settings.pinecone_host.as_deref().ok_or_else(|| {
            GenesisError::Config(format!(
                "PINECONE_HOST not set for index {} ({})",
                settings.pinecone_index_name, settings.pinecone_environment
            ))
        })?;
        Self::new(host, api_key, settings.http_timeout)
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(self.api_key.expose())
                .map_err(|e| GenesisError::Config(format!("Invalid API key: {}", e)))?,
        );
        Ok(headers)
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<reqwest::Response> {
        debug!(host = %self.host, path, "Pinecone request");
        let response = self
            .client
            .post(format!("{}{}", self.host, path))
            .headers(self.build_headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| GenesisError::VectorIndex(format!("Request to {} failed: {}", path, e)))?;
        check_status(path, response).await
    }

    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<reqwest::Response> {
        debug!(host = %self.host, path, "Pinecone request");
        let response = self
            .client
            .get(format!("{}{}", self.host, path))
            .headers(self.build_headers()?)
            .query(params)
            .send()
            .await
            .map_err(|e| GenesisError::VectorIndex(format!("Request to {} failed: {}", path, e)))?;
        check_status(path, response).await
    }

    /// One page of ids from `/vectors/list`, plus the token for the next page.
    async fn list_page(
        &self,
        prefix: Option<&str>,
        token: Option<&str>,
    ) -> Result<(Vec<String>, Option<String>)> {
        let page_size = LIST_PAGE_SIZE.to_string();
        let mut params = vec![("limit", page_size.as_str())];
        if let Some(prefix) = prefix {
            params.push(("prefix", prefix));
        }
        if let Some(token) = token {
            params.push(("paginationToken", token));
        }

        let page: ListResponse = self
            .get("/vectors/list", &params)
            .await?
            .json()
            .await
            .map_err(|e| GenesisError::VectorIndex(format!("Failed to parse list response: {}", e)))?;
        let next = page.pagination.and_then(|p| p.next).filter(|t| !t.is_empty());
        Ok((page.vectors.into_iter().map(|v| v.id).collect(), next))
    }

    /// Metadata of the given ids; ids the index no longer holds are absent.
    async fn fetch_metadata(&self, ids: &[String]) -> Result<HashMap<String, Map<String, Value>>> {
        let params: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        let response: FetchResponse = self
            .get("/vectors/fetch", &params)
            .await?
            .json()
            .await
            .map_err(|e| GenesisError::VectorIndex(format!("Failed to parse fetch response: {}", e)))?;
        Ok(response
            .vectors
            .into_iter()
            .map(|(id, v)| (id, v.metadata.unwrap_or_default()))
            .collect())
    }
}

async fn check_status(path: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(GenesisError::VectorIndex(format!(
            "{} returned HTTP {}: {}",
            path, status, text
        )));
    }
    Ok(response)
}

/// Id prefix shared by every record of the dataset a filter pins, if any.
///
/// Dataset records are keyed `{dataset_id}_schema` and `{dataset_id}_sample_{i}`.
/// The prefix also catches datasets whose id extends this one, so listed ids
/// are still checked against the filter.
fn list_prefix(filter: &MetadataFilter) -> Option<String> {
    filter
        .conditions()
        .iter()
        .find_map(|(key, condition)| match condition {
            Condition::Eq(Value::String(id)) if key == "dataset_id" => Some(format!("{}_", id)),
            _ => None,
        })
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        self.post("/vectors/upsert", &UpsertRequest { vectors: &records })
            .await?;
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<Vec<QueryMatch>> {
        let mut body = json!({
            "vector": request.vector,
            "topK": request.top_k,
            "includeMetadata": true,
        });
        if !request.filter.is_empty() {
            body["filter"] = request.filter.to_json();
        }

        let response: QueryResponse = self
            .post("/query", &body)
            .await?
            .json()
            .await
            .map_err(|e| GenesisError::VectorIndex(format!("Failed to parse query response: {}", e)))?;
        Ok(response.matches)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let body: Value = json!({ "ids": ids });
        self.post("/vectors/delete", &body).await?;
        Ok(())
    }

    /// Pages through `/vectors/list` and confirms each id's metadata with
    /// `/vectors/fetch`. Zero-vector queries are rejected by cosine indexes.
    async fn fetch_ids(&self, filter: &MetadataFilter, limit: usize) -> Result<Vec<String>> {
        let prefix = list_prefix(filter);
        let mut found = Vec::new();
        let mut token: Option<String> = None;

        while found.len() < limit {
            let (ids, next) = self.list_page(prefix.as_deref(), token.as_deref()).await?;
            if filter.is_empty() {
                found.extend(ids);
            } else if !ids.is_empty() {
                let metadata = self.fetch_metadata(&ids).await?;
                found.extend(
                    ids.into_iter()
                        .filter(|id| metadata.get(id).is_some_and(|m| filter.matches(m))),
                );
            }

            match next {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        found.truncate(limit);
        Ok(found)
    }
}
