//! Ingestion and question-answering pipelines.
//!
//! Both flows are expressed over the collaborator traits so the HTTP layer
//! and the `ingest` subcommand share one implementation.

use std::sync::Arc;

use futures::future::join_all;
use futures::{stream, StreamExt, TryStreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use cidrag_core::{chunk_filename, preview, ChunkMetadata, ChunkObject, Cid, Config};
use cidrag_index::{IndexError, VectorIndex};
use cidrag_ingest::embedding::{embed_one, Embedder, EmbeddingError};
use cidrag_ingest::{chunk_text, ChunkError};
use cidrag_llm::{AnswerGenerator, LlmError};
use cidrag_storage::{ContentStore, StorageError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("{provider} completion failed: {source}")]
    Llm { provider: String, source: LlmError },

    #[error("LLM provider not configured")]
    LlmNotConfigured,
}

/// One stored chunk as reported back to the uploader.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct UploadedChunk {
    pub cid: Cid,
    pub filename: String,
    pub preview: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub context: Vec<ChunkObject>,
}

/// Tuning knobs read from config.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub batch_size: usize,
    pub concurrency: usize,
    pub top_k: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.embedding.batch_size.max(1) as usize,
            concurrency: config.ingest.concurrency.max(1),
            top_k: config.retrieval.top_k,
        }
    }
}

pub struct RagPipeline {
    /// Embeds chunk text during ingestion.
    pub embedder: Arc<dyn Embedder>,
    /// Embeds questions; usually the cached wrapper around `embedder`.
    pub question_embedder: Arc<dyn Embedder>,
    pub content: Arc<dyn ContentStore>,
    pub index: Arc<dyn VectorIndex>,
    pub answers: Option<AnswerGenerator>,
    pub settings: PipelineSettings,
}

impl RagPipeline {
    /// Chunk `text`, embed every chunk, then store and index each one.
    ///
    /// The result lists chunks in source order. Empty text yields no chunks.
    pub async fn ingest_text(&self, text: &str, chunk_size: usize) -> Result<Vec<UploadedChunk>, PipelineError> {
        let chunks = chunk_text(text, chunk_size)?;
        if chunks.is_empty() {
            return Ok(Vec::new());
        }
        info!(chunks = chunks.len(), chunk_size, "ingesting text");

        let batch_size = self.settings.batch_size.max(1);
        let batches = chunks.len().div_ceil(batch_size);
        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        for (i, batch) in chunks.chunks(batch_size).enumerate() {
            debug!("embedding batch {}/{} ({} chunks)", i + 1, batches, batch.len());
            let texts: Vec<&str> = batch.iter().map(String::as_str).collect();
            embeddings.extend(self.embedder.embed_batch(&texts).await?);
        }
        if embeddings.len() != chunks.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunks.len(),
                actual: embeddings.len(),
            }
            .into());
        }

        let uploaded: Vec<UploadedChunk> = stream::iter(chunks.into_iter().zip(embeddings).enumerate())
            .map(|(index, (content, embedding))| self.store_chunk(index, content, embedding))
            .buffered(self.settings.concurrency.max(1))
            .try_collect()
            .await?;

        info!(chunks = uploaded.len(), store = self.content.name(), index = self.index.name(), "ingestion complete");
        Ok(uploaded)
    }

    async fn store_chunk(&self, index: usize, content: String, embedding: Vec<f32>) -> Result<UploadedChunk, PipelineError> {
        let filename = chunk_filename(index);
        let object = ChunkObject::for_index(index, content);

        let cid = self.content.put_json(&object, &filename).await?;
        self.index
            .add(&cid, embedding, ChunkMetadata::for_index(index))
            .await?;
        debug!(cid = %cid, filename = %filename, "chunk stored and indexed");

        Ok(UploadedChunk {
            preview: preview(&object.content),
            cid,
            filename,
        })
    }

    /// Retrieve context for `question` and ask the configured model.
    pub async fn answer_question(&self, question: &str) -> Result<Answer, PipelineError> {
        let generator = self.answers.as_ref().ok_or(PipelineError::LlmNotConfigured)?;

        let embedding = embed_one(self.question_embedder.as_ref(), question).await?;
        let context = self.retrieve(embedding).await;

        let answer = generator
            .answer(question, &context)
            .await
            .map_err(|source| PipelineError::Llm {
                provider: generator.provider_name().to_string(),
                source,
            })?;

        Ok(Answer { answer, context })
    }

    /// Nearest chunks for `embedding`. Index and fetch failures shrink the
    /// context instead of failing the question.
    async fn retrieve(&self, embedding: Vec<f32>) -> Vec<ChunkObject> {
        let hits = match self.index.query(embedding, self.settings.top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(index = self.index.name(), "retrieval failed, answering without context: {}", e);
                return Vec::new();
            }
        };

        let fetches = hits.iter().filter_map(|hit| {
            let metadata = hit.metadata.as_ref()?;
            Some(self.content.get_json(&hit.id, &metadata.filename))
        });

        let context: Vec<ChunkObject> = join_all(fetches)
            .await
            .into_iter()
            .filter_map(|fetched| match fetched {
                Ok(object) => object,
                Err(e) => {
                    warn!("dropping chunk from context: {}", e);
                    None
                }
            })
            .collect();

        info!(hits = hits.len(), context = context.len(), "retrieved context");
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{failing_index, memory_pipeline, Recorder};
    use cidrag_index::MemoryIndex;

    #[tokio::test]
    async fn empty_text_yields_no_chunks_and_no_calls() {
        let fixture = memory_pipeline(None);
        let uploaded = fixture.pipeline.ingest_text("", 20).await.unwrap();
        assert!(uploaded.is_empty());
        assert!(fixture.embedder.batches().is_empty());
    }

    #[tokio::test]
    async fn zero_chunk_size_is_rejected() {
        let fixture = memory_pipeline(None);
        let err = fixture.pipeline.ingest_text("Hi.", 0).await.unwrap_err();
        assert!(matches!(err, PipelineError::Chunk(ChunkError::InvalidChunkSize(0))));
    }

    #[tokio::test]
    async fn embeds_in_batches_and_keeps_source_order() {
        let mut fixture = memory_pipeline(None);
        fixture.pipeline.settings.batch_size = 2;
        fixture.pipeline.settings.concurrency = 3;

        let uploaded = fixture
            .pipeline
            .ingest_text("One. Two. Three. Four. Five.", 5)
            .await
            .unwrap();

        let filenames: Vec<&str> = uploaded.iter().map(|u| u.filename.as_str()).collect();
        assert_eq!(filenames, ["chunk-0.json", "chunk-1.json", "chunk-2.json", "chunk-3.json", "chunk-4.json"]);
        assert_eq!(uploaded[2].preview, "Three.");
        assert_eq!(fixture.embedder.batches(), vec![2, 2, 1]);
        assert_eq!(fixture.index.len().await, 5);

        let stored = fixture
            .pipeline
            .content
            .get_json(&uploaded[3].cid, "chunk-3.json")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, ChunkObject::for_index(3, "Four."));
    }

    #[tokio::test]
    async fn answer_uses_nearest_chunk_as_context() {
        let recorder = Recorder::new("Paris.");
        let fixture = memory_pipeline(Some(recorder.boxed()));
        fixture
            .pipeline
            .ingest_text("Bananas are yellow. The capital of France is Paris.", 25)
            .await
            .unwrap();

        let answer = fixture
            .pipeline
            .answer_question("The capital of France is Paris.")
            .await
            .unwrap();
        assert_eq!(answer.answer, "Paris.");
        assert_eq!(answer.context, vec![ChunkObject::for_index(1, "The capital of France is Paris.")]);
        assert!(recorder.prompts()[0].starts_with("Use the following knowledge"));
    }

    #[tokio::test]
    async fn index_failure_degrades_to_no_context() {
        let recorder = Recorder::new("Unsure.");
        let mut fixture = memory_pipeline(Some(recorder.boxed()));
        fixture.pipeline.index = failing_index();

        let answer = fixture.pipeline.answer_question("Anything?").await.unwrap();
        assert!(answer.context.is_empty());
        assert_eq!(recorder.prompts(), vec!["Question: Anything?\n\nAnswer:".to_string()]);
    }

    #[tokio::test]
    async fn unfetchable_hits_are_dropped() {
        let recorder = Recorder::new("ok");
        let mut fixture = memory_pipeline(Some(recorder.boxed()));
        let index = Arc::new(MemoryIndex::new());
        index
            .add("bdead", vec![1.0, 0.0, 0.0], ChunkMetadata::for_index(0))
            .await
            .unwrap();
        fixture.pipeline.index = index;

        // Indexed, but nothing was ever stored under this id.
        let answer = fixture.pipeline.answer_question("q").await.unwrap();
        assert!(answer.context.is_empty());
    }

    #[tokio::test]
    async fn missing_llm_is_reported_before_embedding() {
        let fixture = memory_pipeline(None);
        let err = fixture.pipeline.answer_question("q").await.unwrap_err();
        assert!(matches!(err, PipelineError::LlmNotConfigured));
        assert!(fixture.embedder.batches().is_empty());
    }
}
