use std::cmp::Ordering;

use async_trait::async_trait;
use tokio::sync::RwLock;

use cidrag_core::ChunkMetadata;

use crate::error::IndexError;
use crate::{IndexHit, VectorIndex};

struct Entry {
    id: String,
    vector: Vec<f32>,
    metadata: ChunkMetadata,
}

/// In-process index ranked by cosine distance. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryIndex {
    entries: RwLock<Vec<Entry>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// `1 - cos(a, b)`; zero vectors are maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn add(&self, id: &str, embedding: Vec<f32>, metadata: ChunkMetadata) -> Result<(), IndexError> {
        let mut entries = self.entries.write().await;
        if let Some(first) = entries.first() {
            if first.vector.len() != embedding.len() {
                return Err(IndexError::DimensionMismatch {
                    expected: first.vector.len(),
                    actual: embedding.len(),
                });
            }
        }

        let entry = Entry {
            id: id.to_string(),
            vector: embedding,
            metadata,
        };
        match entries.iter_mut().find(|e| e.id == id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        Ok(())
    }

    async fn query(&self, embedding: Vec<f32>, top_k: usize) -> Result<Vec<IndexHit>, IndexError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let entries = self.entries.read().await;
        let mut scored: Vec<(f32, &Entry)> = entries
            .iter()
            .filter(|e| e.vector.len() == embedding.len())
            .map(|e| (cosine_distance(&embedding, &e.vector), e))
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(distance, e)| IndexHit {
                id: e.id.clone(),
                metadata: Some(e.metadata.clone()),
                distance: Some(distance),
            })
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_basics() {
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[tokio::test]
    async fn nearest_first() {
        let index = MemoryIndex::new();
        index.add("bafy-east", vec![1.0, 0.0], ChunkMetadata::for_index(0)).await.unwrap();
        index.add("bafy-north", vec![0.0, 1.0], ChunkMetadata::for_index(1)).await.unwrap();
        index.add("bafy-ne", vec![0.7, 0.7], ChunkMetadata::for_index(2)).await.unwrap();

        let hits = index.query(vec![0.9, 0.1], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "bafy-east");
        assert_eq!(hits[1].id, "bafy-ne");
        assert_eq!(hits[0].metadata.as_ref().unwrap().filename, "chunk-0.json");
        assert!(hits[0].distance.unwrap() <= hits[1].distance.unwrap());
    }

    #[tokio::test]
    async fn top_k_zero_and_empty_index() {
        let index = MemoryIndex::new();
        assert!(index.query(vec![1.0], 3).await.unwrap().is_empty());

        index.add("a", vec![1.0], ChunkMetadata::for_index(0)).await.unwrap();
        assert!(index.query(vec![1.0], 0).await.unwrap().is_empty());
        assert_eq!(index.query(vec![1.0], 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn re_adding_an_id_replaces_it() {
        let index = MemoryIndex::new();
        index.add("a", vec![1.0, 0.0], ChunkMetadata::for_index(0)).await.unwrap();
        index.add("a", vec![0.0, 1.0], ChunkMetadata::for_index(5)).await.unwrap();
        assert_eq!(index.len().await, 1);

        let hits = index.query(vec![0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].metadata.as_ref().unwrap().index, 5);
    }

    #[tokio::test]
    async fn rejects_mixed_dimensions() {
        let index = MemoryIndex::new();
        index.add("a", vec![1.0, 0.0], ChunkMetadata::for_index(0)).await.unwrap();
        let err = index.add("b", vec![1.0], ChunkMetadata::for_index(1)).await.unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { expected: 2, actual: 1 }));
    }
}
