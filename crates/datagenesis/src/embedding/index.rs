//! Vector index seam: records, metadata filters and queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::Result;

/// A vector with its id and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// One condition on a metadata key.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    /// Also satisfied when the key is absent.
    Ne(Value),
}

/// Conjunction of metadata conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    conditions: Vec<(String, Condition)>,
}

impl MetadataFilter {
    /// Filter that matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `metadata[key] == value`.
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((key.into(), Condition::Eq(value.into())));
        self
    }

    /// Require `metadata[key] != value`.
    pub fn ne(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((key.into(), Condition::Ne(value.into())));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[(String, Condition)] {
        &self.conditions
    }

    /// Returns true if `metadata` satisfies every condition.
    pub fn matches(&self, metadata: &Map<String, Value>) -> bool {
        self.conditions.iter().all(|(key, condition)| match condition {
            Condition::Eq(v) => metadata.get(key) == Some(v),
            Condition::Ne(v) => metadata.get(key) != Some(v),
        })
    }

    /// Pinecone filter document, e.g. `{"type": {"$eq": "schema"}}`.
    pub fn to_json(&self) -> Value {
        let mut doc = Map::new();
        for (key, condition) in &self.conditions {
            let (op, value) = match condition {
                Condition::Eq(v) => ("$eq", v),
                Condition::Ne(v) => ("$ne", v),
            };
            let entry = doc.entry(key.clone()).or_insert_with(|| json!({}));
            if let Value::Object(ops) = entry {
                ops.insert(op.to_string(), value.clone());
            }
        }
        Value::Object(doc)
    }
}

/// Nearest-neighbour query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub filter: MetadataFilter,
}

impl QueryRequest {
    pub fn new(vector: Vec<f32>, top_k: usize) -> Self {
        Self {
            vector,
            top_k,
            filter: MetadataFilter::new(),
        }
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// A query hit, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Storage and similarity search for vectors.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Dimension of stored vectors.
    fn dimension(&self) -> usize;

    /// Insert or replace records by id.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Best `top_k` matches satisfying the filter, in descending score order.
    async fn query(&self, request: QueryRequest) -> Result<Vec<QueryMatch>>;

    /// Delete records by id. Unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> Result<()>;

    /// Ids of up to `limit` records satisfying the filter.
    ///
    /// The default issues a zero-vector query, which only works for indexes
    /// that rank every candidate. Indexes that can list by filter override it.
    async fn fetch_ids(&self, filter: &MetadataFilter, limit: usize) -> Result<Vec<String>> {
        let probe = QueryRequest::new(vec![0.0; self.dimension()], limit).with_filter(filter.clone());
        let matches = self.query(probe).await?;
        Ok(matches.into_iter().map(|m| m.id).collect())
    }
}
