//! Vector index over chunk embeddings, keyed by content CID.

pub mod chroma;
pub mod error;
pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use cidrag_core::{ChunkMetadata, Cid, Config};

pub use chroma::ChromaIndex;
pub use error::IndexError;
pub use memory::MemoryIndex;
pub use postgres::PgVectorIndex;

/// One nearest-neighbour result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    pub id: Cid,
    /// Missing when the backend stored no (or unreadable) metadata.
    pub metadata: Option<ChunkMetadata>,
    /// Backend-reported distance, smaller is closer.
    pub distance: Option<f32>,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Index `embedding` under `id` with its chunk metadata.
    async fn add(&self, id: &str, embedding: Vec<f32>, metadata: ChunkMetadata) -> Result<(), IndexError>;

    /// Up to `top_k` nearest entries, closest first. `top_k == 0` yields none.
    async fn query(&self, embedding: Vec<f32>, top_k: usize) -> Result<Vec<IndexHit>, IndexError>;

    fn name(&self) -> &str;
}

/// Build the configured index (`VECTOR_INDEX=chroma|pgvector|memory`).
pub async fn index_from_config(
    config: &Config,
    client: reqwest::Client,
) -> Result<Arc<dyn VectorIndex>, IndexError> {
    let index: Arc<dyn VectorIndex> = match config.index.backend.to_lowercase().as_str() {
        "chroma" => Arc::new(ChromaIndex::new(
            client,
            &config.index.chroma_url,
            &config.index.chroma_collection,
        )),
        "pgvector" | "postgres" => Arc::new(PgVectorIndex::connect(&config.postgres).await?),
        "memory" => Arc::new(MemoryIndex::new()),
        other => {
            return Err(IndexError::NotConfigured(format!(
                "unknown VECTOR_INDEX '{other}' (expected chroma, pgvector or memory)"
            )))
        }
    };

    info!(backend = index.name(), "vector index ready");
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn selects_backend_by_name() {
        let mut config = Config::for_profile("");

        config.index.backend = "memory".into();
        let index = index_from_config(&config, reqwest::Client::new()).await.unwrap();
        assert_eq!(index.name(), "memory");

        config.index.backend = "Chroma".into();
        let index = index_from_config(&config, reqwest::Client::new()).await.unwrap();
        assert_eq!(index.name(), "chroma");

        config.index.backend = "faiss".into();
        let err = index_from_config(&config, reqwest::Client::new()).await.err().unwrap();
        assert!(matches!(err, IndexError::NotConfigured(_)));
    }

    #[test]
    fn hit_serializes_missing_fields_as_null() {
        let hit = IndexHit {
            id: "bafy".into(),
            metadata: None,
            distance: None,
        };
        assert_eq!(
            serde_json::to_string(&hit).unwrap(),
            r#"{"id":"bafy","metadata":null,"distance":null}"#
        );
    }
}
