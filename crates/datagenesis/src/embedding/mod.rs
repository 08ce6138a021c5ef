//! Vector embeddings of schemas, sample rows and domain patterns.
//!
//! [`EmbeddingStore`] sits on two seams: an [`Embedder`] turning text into
//! fixed-size vectors and a [`VectorIndex`] storing and searching them.
//! [`HashEmbedder`] and [`InMemoryIndex`] work offline; [`PineconeIndex`]
//! talks to a hosted index.
//!
//! # Example
//!
//! ```
//! use datagenesis::embedding::EmbeddingStore;
//! use serde_json::json;
//!
//! # async fn run() {
//! let store = EmbeddingStore::in_memory();
//! let schema = json!({"patient_id": {"type": "uuid"}});
//! store.store_dataset_embeddings("ds-1", &schema, &[]).await;
//! let similar = store.find_similar_datasets(&schema, &[], 5).await;
//! assert_eq!(similar[0].dataset_id, "ds-1");
//! # }
//! ```

mod embedder;
mod index;
mod memory;
mod pinecone;
mod store;

pub use embedder::{Embedder, HashEmbedder};
pub use index::{Condition, MetadataFilter, QueryMatch, QueryRequest, VectorIndex, VectorRecord};
pub use memory::InMemoryIndex;
pub use pinecone::PineconeIndex;
pub use store::{
    CLEANUP_LIMIT, CONTENT_PREVIEW_CHARS, CrossDomainInsight, EmbeddingStore, INSIGHT_MIN_SCORE,
    INSIGHT_TOP_K, MAX_SAMPLE_ROWS, PATTERN_PREVIEW_CHARS, SimilarDataset,
};

/// Dimension of stored vectors.
pub const EMBEDDING_DIMENSION: usize = 384;

/// Cosine similarity of two vectors; 0.0 when either is all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
