//! In-process vector index with brute-force cosine search.

use std::sync::RwLock;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::{GenesisError, Result};

use super::cosine_similarity;
use super::index::{MetadataFilter, QueryMatch, QueryRequest, VectorIndex, VectorRecord};

/// Vector index held in memory.
///
/// Records keep insertion order, so equal scores rank in the order the
/// records were first stored.
pub struct InMemoryIndex {
    dimension: usize,
    records: RwLock<IndexMap<String, VectorRecord>>,
}

impl InMemoryIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::new(IndexMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored record by id.
    pub fn get(&self, id: &str) -> Option<VectorRecord> {
        self.records.read().ok()?.get(id).cloned()
    }

    /// All stored ids in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.records
            .read()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn poisoned() -> GenesisError {
        GenesisError::VectorIndex("in-memory index lock poisoned".to_string())
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        if let Some(bad) = records.iter().find(|r| r.values.len() != self.dimension) {
            return Err(GenesisError::VectorIndex(format!(
                "Vector {} has dimension {}, index expects {}",
                bad.id,
                bad.values.len(),
                self.dimension
            )));
        }

        let mut stored = self.records.write().map_err(|_| Self::poisoned())?;
        for record in records {
            stored.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<Vec<QueryMatch>> {
        if request.vector.len() != self.dimension {
            return Err(GenesisError::VectorIndex(format!(
                "Query vector has dimension {}, index expects {}",
                request.vector.len(),
                self.dimension
            )));
        }

        let stored = self.records.read().map_err(|_| Self::poisoned())?;
        let mut matches: Vec<QueryMatch> = stored
            .values()
            .filter(|r| request.filter.matches(&r.metadata))
            .map(|r| QueryMatch {
                id: r.id.clone(),
                score: cosine_similarity(&request.vector, &r.values),
                metadata: r.metadata.clone(),
            })
            .collect();

        // Stable sort keeps insertion order among ties.
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(request.top_k);
        Ok(matches)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut stored = self.records.write().map_err(|_| Self::poisoned())?;
        for id in ids {
            stored.shift_remove(id);
        }
        Ok(())
    }

    async fn fetch_ids(&self, filter: &MetadataFilter, limit: usize) -> Result<Vec<String>> {
        let stored = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(stored
            .values()
            .filter(|r| filter.matches(&r.metadata))
            .take(limit)
            .map(|r| r.id.clone())
            .collect())
    }
}
