use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lru::LruCache;

use super::traits::{check_count, Embedder, EmbeddingError};

/// LRU cache mapping text to embedding vector.
pub struct EmbeddingCache {
    cache: LruCache<String, Vec<f32>>,
    hits: u64,
    misses: u64,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a cached embedding by text.
    pub fn get(&mut self, text: &str) -> Option<Vec<f32>> {
        if let Some(vec) = self.cache.get(text) {
            self.hits += 1;
            Some(vec.clone())
        } else {
            self.misses += 1;
            None
        }
    }

    /// Store an embedding for a text.
    pub fn put(&mut self, text: &str, embedding: Vec<f32>) {
        self.cache.put(text.to_string(), embedding);
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Wraps an embedder so repeated texts (usually questions) skip the backend.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Mutex<EmbeddingCache>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(EmbeddingCache::new(capacity)),
        }
    }

    /// `(hits, misses)` so far.
    pub fn stats(&self) -> (u64, u64) {
        match self.cache.lock() {
            Ok(cache) => (cache.hits(), cache.misses()),
            Err(_) => (0, 0),
        }
    }

    fn lookup(&self, texts: &[&str]) -> Vec<Option<Vec<f32>>> {
        match self.cache.lock() {
            Ok(mut cache) => texts.iter().map(|t| cache.get(t)).collect(),
            Err(_) => vec![None; texts.len()],
        }
    }

    fn store(&self, texts: &[&str], vectors: &[Vec<f32>]) {
        if let Ok(mut cache) = self.cache.lock() {
            for (text, vector) in texts.iter().zip(vectors) {
                cache.put(text, vector.clone());
            }
        }
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut results = self.lookup(texts);

        let missing: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_none())
            .map(|(i, _)| i)
            .collect();

        if !missing.is_empty() {
            let to_embed: Vec<&str> = missing.iter().map(|&i| texts[i]).collect();
            let fresh = self.inner.embed_batch(&to_embed).await?;
            check_count(to_embed.len(), fresh.len())?;
            self.store(&to_embed, &fresh);
            for (slot, vector) in missing.into_iter().zip(fresh) {
                results[slot] = Some(vector);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn cache_hit_and_miss() {
        let mut cache = EmbeddingCache::new(100);

        assert!(cache.get("hello").is_none());
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 0);

        cache.put("hello", vec![1.0, 2.0, 3.0]);
        let result = cache.get("hello").unwrap();
        assert_eq!(result, vec![1.0, 2.0, 3.0]);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn cache_eviction() {
        let mut cache = EmbeddingCache::new(2);

        cache.put("a", vec![1.0]);
        cache.put("b", vec![2.0]);
        cache.put("c", vec![3.0]); // evicts "a"

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn keys_are_the_exact_text() {
        let mut cache = EmbeddingCache::new(8);
        cache.put("what is ipfs?", vec![1.0]);
        cache.put("What is IPFS?", vec![2.0]);
        assert_eq!(cache.get("what is ipfs?"), Some(vec![1.0]));
        assert_eq!(cache.get("What is IPFS?"), Some(vec![2.0]));
        assert!(cache.get("what is ipfs").is_none());
    }

    #[test]
    fn zero_capacity_still_holds_one() {
        let mut cache = EmbeddingCache::new(0);
        cache.put("x", vec![1.0]);
        assert!(!cache.is_empty());
    }

    /// Encodes text length as the vector and counts texts sent upstream.
    struct Counting {
        calls: AtomicUsize,
        texts: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for Counting {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.texts.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }
        fn dimensions(&self) -> usize {
            1
        }
        fn name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn cached_embedder_only_sends_misses() {
        let inner = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            texts: AtomicUsize::new(0),
        });
        let cached = CachedEmbedder::new(inner.clone(), 16);

        let first = cached.embed_batch(&["a", "bb"]).await.unwrap();
        assert_eq!(first, vec![vec![1.0], vec![2.0]]);

        let second = cached.embed_batch(&["ccc", "a", "bb"]).await.unwrap();
        assert_eq!(second, vec![vec![3.0], vec![1.0], vec![2.0]]);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(inner.texts.load(Ordering::SeqCst), 3);

        cached.embed_batch(&["a"]).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cached.name(), "counting");
        assert_eq!(cached.stats(), (3, 3));
    }
}
