//! Dataset and domain-pattern embeddings over a vector index.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::error::{GenesisError, Result};

use super::embedder::{Embedder, HashEmbedder};
use super::index::{MetadataFilter, QueryRequest, VectorIndex, VectorRecord};
use super::memory::InMemoryIndex;

/// Sample rows embedded per dataset.
pub const MAX_SAMPLE_ROWS: usize = 10;

/// Characters of schema/sample text kept in metadata.
pub const CONTENT_PREVIEW_CHARS: usize = 1000;

/// Characters of domain-pattern text kept in metadata.
pub const PATTERN_PREVIEW_CHARS: usize = 2000;

/// Candidates examined for cross-domain insights.
pub const INSIGHT_TOP_K: usize = 10;

/// Minimum similarity for a cross-domain insight.
pub const INSIGHT_MIN_SCORE: f32 = 0.7;

/// Maximum vectors removed per dataset cleanup.
pub const CLEANUP_LIMIT: usize = 10_000;

/// A stored dataset resembling a query schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarDataset {
    pub dataset_id: String,
    pub similarity_score: f32,
    pub metadata: Map<String, Value>,
}

/// Patterns from another domain that may apply to the target domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossDomainInsight {
    pub source_domain: String,
    pub similarity_score: f32,
    /// Stored patterns; a JSON string when the stored preview was cut short.
    pub applicable_patterns: Value,
}

/// Embedding store for datasets and domain patterns.
///
/// Every operation swallows failures: errors are logged and reported as
/// `false` or an empty list.
pub struct EmbeddingStore {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl EmbeddingStore {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Store backed by [`HashEmbedder`] and an [`InMemoryIndex`].
    pub fn in_memory() -> Self {
        let embedder = HashEmbedder::new();
        let index = InMemoryIndex::new(embedder.dimension());
        Self::new(Arc::new(embedder), Arc::new(index))
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = self.embedder.embed_batch(texts).await?;
        if vectors.len() != texts.len() {
            return Err(GenesisError::Embedding(format!(
                "Embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    async fn embed_one(&self, text: String) -> Result<Vec<f32>> {
        self.embed(&[text])
            .await?
            .pop()
            .ok_or_else(|| GenesisError::Embedding("Embedder returned no vector".to_string()))
    }

    /// Embed a dataset's schema and its first sample rows.
    ///
    /// Writes `{dataset_id}_schema` plus `{dataset_id}_sample_{i}` for up to
    /// [`MAX_SAMPLE_ROWS`] rows, in one embed call and one upsert.
    pub async fn store_dataset_embeddings(
        &self,
        dataset_id: &str,
        schema: &Value,
        sample_rows: &[Value],
    ) -> bool {
        match self.try_store_dataset(dataset_id, schema, sample_rows).await {
            Ok(count) => {
                info!(dataset_id, vectors = count, "Stored dataset embeddings");
                true
            }
            Err(e) => {
                error!(dataset_id, error = %e, "Error storing embeddings");
                false
            }
        }
    }

    async fn try_store_dataset(
        &self,
        dataset_id: &str,
        schema: &Value,
        sample_rows: &[Value],
    ) -> Result<usize> {
        let mut texts = vec![serde_json::to_string(schema)?];
        for row in sample_rows.iter().take(MAX_SAMPLE_ROWS) {
            texts.push(serde_json::to_string(row)?);
        }

        let vectors = self.embed(&texts).await?;
        let records: Vec<VectorRecord> = texts
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (text, values))| {
                let (id, kind) = if i == 0 {
                    (format!("{}_schema", dataset_id), "schema")
                } else {
                    (format!("{}_sample_{}", dataset_id, i - 1), "sample")
                };
                let mut metadata = Map::new();
                metadata.insert("dataset_id".to_string(), dataset_id.into());
                metadata.insert("type".to_string(), kind.into());
                metadata.insert("content".to_string(), preview(text, CONTENT_PREVIEW_CHARS).into());
                VectorRecord {
                    id,
                    values,
                    metadata,
                }
            })
            .collect();

        let count = records.len();
        self.index.upsert(records).await?;
        Ok(count)
    }

    /// Stored datasets whose schema resembles `query_schema`, best first.
    ///
    /// Ranking uses the schema text only; `query_samples` do not influence it.
    /// Each dataset appears at most once.
    pub async fn find_similar_datasets(
        &self,
        query_schema: &Value,
        query_samples: &[Value],
        top_k: usize,
    ) -> Vec<SimilarDataset> {
        debug!(samples = query_samples.len(), top_k, "Finding similar datasets");
        match self.try_find_similar(query_schema, top_k).await {
            Ok(found) => found,
            Err(e) => {
                error!(error = %e, "Error finding similar datasets");
                Vec::new()
            }
        }
    }

    async fn try_find_similar(&self, query_schema: &Value, top_k: usize) -> Result<Vec<SimilarDataset>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.embed_one(serde_json::to_string(query_schema)?).await?;
        let request = QueryRequest::new(vector, top_k * 2)
            .with_filter(MetadataFilter::new().eq("type", "schema"));
        let matches = self.index.query(request).await?;

        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for m in matches {
            let Some(dataset_id) = m.metadata.get("dataset_id").and_then(Value::as_str) else {
                continue;
            };
            if seen.insert(dataset_id.to_string()) {
                found.push(SimilarDataset {
                    dataset_id: dataset_id.to_string(),
                    similarity_score: m.score,
                    metadata: m.metadata.clone(),
                });
            }
            if found.len() >= top_k {
                break;
            }
        }
        Ok(found)
    }

    /// Store the pattern summary of a domain as `domain_{domain}`.
    pub async fn store_domain_patterns(&self, domain: &str, patterns: &Value) -> bool {
        match self.try_store_patterns(domain, patterns).await {
            Ok(()) => {
                info!(domain, "Stored domain patterns");
                true
            }
            Err(e) => {
                error!(domain, error = %e, "Error storing domain patterns");
                false
            }
        }
    }

    async fn try_store_patterns(&self, domain: &str, patterns: &Value) -> Result<()> {
        let text = serde_json::to_string(patterns)?;
        let values = self.embed_one(text.clone()).await?;

        let mut metadata = Map::new();
        metadata.insert("type".to_string(), "domain_pattern".into());
        metadata.insert("domain".to_string(), domain.into());
        metadata.insert("patterns".to_string(), preview(&text, PATTERN_PREVIEW_CHARS).into());

        self.index
            .upsert(vec![VectorRecord {
                id: format!("domain_{}", domain),
                values,
                metadata,
            }])
            .await
    }

    /// Patterns of other domains that closely resemble `query_data`.
    pub async fn get_cross_domain_insights(
        &self,
        target_domain: &str,
        query_data: &Value,
    ) -> Vec<CrossDomainInsight> {
        match self.try_cross_domain(target_domain, query_data).await {
            Ok(insights) => insights,
            Err(e) => {
                error!(target_domain, error = %e, "Error getting cross-domain insights");
                Vec::new()
            }
        }
    }

    async fn try_cross_domain(&self, target_domain: &str, query_data: &Value) -> Result<Vec<CrossDomainInsight>> {
        let vector = self.embed_one(serde_json::to_string(query_data)?).await?;
        let filter = MetadataFilter::new()
            .eq("type", "domain_pattern")
            .ne("domain", target_domain);
        let matches = self
            .index
            .query(QueryRequest::new(vector, INSIGHT_TOP_K).with_filter(filter))
            .await?;

        Ok(matches
            .into_iter()
            .filter(|m| m.score > INSIGHT_MIN_SCORE)
            .filter_map(|m| {
                let source_domain = m.metadata.get("domain")?.as_str()?.to_string();
                let stored = m.metadata.get("patterns").and_then(Value::as_str).unwrap_or_default();
                let applicable_patterns = serde_json::from_str(stored)
                    .unwrap_or_else(|_| Value::String(stored.to_string()));
                Some(CrossDomainInsight {
                    source_domain,
                    similarity_score: m.score,
                    applicable_patterns,
                })
            })
            .collect())
    }

    /// Remove every vector stored for a dataset.
    pub async fn cleanup_dataset_embeddings(&self, dataset_id: &str) -> bool {
        match self.try_cleanup(dataset_id).await {
            Ok(removed) => {
                info!(dataset_id, removed, "Cleaned up dataset embeddings");
                true
            }
            Err(e) => {
                error!(dataset_id, error = %e, "Error cleaning up embeddings");
                false
            }
        }
    }

    async fn try_cleanup(&self, dataset_id: &str) -> Result<usize> {
        let filter = MetadataFilter::new().eq("dataset_id", dataset_id);
        let ids = self.index.fetch_ids(&filter, CLEANUP_LIMIT).await?;
        if ids.is_empty() {
            return Ok(0);
        }
        self.index.delete(&ids).await?;
        Ok(ids.len())
    }
}

/// First `max_chars` characters of `text`.
fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
