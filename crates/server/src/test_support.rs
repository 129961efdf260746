//! Fakes and fixtures shared by the server's unit tests.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use cidrag_core::{ChunkMetadata, Config};
use cidrag_index::{IndexError, IndexHit, MemoryIndex, VectorIndex};
use cidrag_ingest::embedding::{Embedder, EmbeddingError};
use cidrag_llm::{AnswerGenerator, LlmError, LlmProvider, Message};
use cidrag_storage::{LocalBackend, ObjectContentStore, RetryPolicy, StorageBackend};

use crate::pipeline::{PipelineSettings, RagPipeline};
use crate::state::AppState;

/// Deterministic 3-d embedding: length, vowel count, capitals + 1.
#[derive(Default)]
pub struct FakeEmbedder {
    batches: Mutex<Vec<usize>>,
}

impl FakeEmbedder {
    pub fn batches(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let vowels = text.chars().filter(|c| "aeiouAEIOU".contains(*c)).count();
        let capitals = text.chars().filter(|c| c.is_uppercase()).count();
        vec![text.chars().count() as f32, vowels as f32, capitals as f32 + 1.0]
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.batches.lock().unwrap().push(texts.len());
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Chat model that records prompts and answers with a fixed reply.
#[derive(Clone)]
pub struct Recorder {
    reply: &'static str,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new(reply: &'static str) -> Self {
        Self {
            reply,
            prompts: Arc::default(),
        }
    }

    pub fn boxed(&self) -> Box<dyn LlmProvider> {
        Box::new(self.clone())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for Recorder {
    async fn complete(&self, messages: Vec<Message>, _temperature: f32, _max_tokens: u32) -> Result<String, LlmError> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.extend(messages.into_iter().map(|m| m.content));
        Ok(self.reply.to_string())
    }

    fn name(&self) -> &str {
        "Recorder"
    }
}

/// Chat model whose upstream always rejects the call.
pub struct Unavailable;

#[async_trait]
impl LlmProvider for Unavailable {
    async fn complete(&self, _messages: Vec<Message>, _temperature: f32, _max_tokens: u32) -> Result<String, LlmError> {
        Err(LlmError::ApiError {
            status: 503,
            body: "overloaded".into(),
        })
    }

    fn name(&self) -> &str {
        "Mistral"
    }
}

struct BrokenIndex;

#[async_trait]
impl VectorIndex for BrokenIndex {
    async fn add(&self, _id: &str, _embedding: Vec<f32>, _metadata: ChunkMetadata) -> Result<(), IndexError> {
        Err(IndexError::NotConfigured("broken".into()))
    }

    async fn query(&self, _embedding: Vec<f32>, _top_k: usize) -> Result<Vec<IndexHit>, IndexError> {
        Err(IndexError::NotConfigured("broken".into()))
    }

    fn name(&self) -> &str {
        "broken"
    }
}

pub fn failing_index() -> Arc<dyn VectorIndex> {
    Arc::new(BrokenIndex)
}

pub struct Fixture {
    pub pipeline: RagPipeline,
    pub embedder: Arc<FakeEmbedder>,
    pub index: Arc<MemoryIndex>,
    pub dir: TempDir,
}

impl Fixture {
    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Pipeline over an on-disk object store and the in-memory index.
pub fn memory_pipeline(llm: Option<Box<dyn LlmProvider>>) -> Fixture {
    let dir = TempDir::new().unwrap();
    let backend = StorageBackend::Local(LocalBackend::new(&dir.path().join("objects")).unwrap());
    let policy = RetryPolicy::new(1, Duration::ZERO, Duration::from_secs(5));

    let embedder = Arc::new(FakeEmbedder::default());
    let index = Arc::new(MemoryIndex::new());
    let pipeline = RagPipeline {
        embedder: embedder.clone(),
        question_embedder: embedder.clone(),
        content: Arc::new(ObjectContentStore::new(backend, policy)),
        index: index.clone(),
        answers: llm.map(|provider| AnswerGenerator::new(provider, 0.7, 200)),
        settings: PipelineSettings {
            batch_size: 64,
            concurrency: 4,
            top_k: 1,
        },
    };

    Fixture {
        pipeline,
        embedder,
        index,
        dir,
    }
}

/// Router state around a fixture; the knowledge file lives in the temp dir.
pub fn app_state(fixture: Fixture) -> (Arc<AppState>, TempDir) {
    app_state_with(fixture, |_| {})
}

pub fn app_state_with(fixture: Fixture, tweak: impl FnOnce(&mut Config)) -> (Arc<AppState>, TempDir) {
    let mut config = Config::for_profile("");
    config.storage.data_dir = fixture.data_dir().to_path_buf();
    config.storage.knowledge_file = fixture.data_dir().join("knowledge.txt");
    config.server.cors_origin = "*".into();
    config.ingest.text_chunk_size = 3000;
    config.ingest.pdf_chunk_size = 3000;
    config.ingest.url_chunk_size = 12000;
    tweak(&mut config);

    let Fixture { pipeline, dir, .. } = fixture;
    let state = Arc::new(AppState {
        config,
        pipeline,
        http: reqwest::Client::new(),
    });
    (state, dir)
}
