//! Application configuration builders.
//!
//! Constructs the embedding and answer subsystems from `Config`.

use std::sync::Arc;

use tracing::{info, warn};

use cidrag_core::{CidragError, Config};
use cidrag_ingest::embedding::{CachedEmbedder, Embedder, OllamaEmbedder, OpenAiEmbedder};
use cidrag_llm::AnswerGenerator;

/// Load configuration from `.env` and environment variables.
pub fn load_config() -> Config {
    cidrag_core::config::load_dotenv();
    Config::from_env()
}

/// Build the embedder selected by `EMBEDDING_PROVIDER`.
pub fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>, CidragError> {
    let embedding = &config.embedding;
    let dims = embedding.dimensions as usize;

    let embedder: Arc<dyn Embedder> = match embedding.provider.to_lowercase().as_str() {
        "openai" => {
            let api_key = embedding.api_key.clone().ok_or_else(|| {
                CidragError::NotConfigured("EMBEDDING_API_KEY or OPENAI_API_KEY not set".into())
            })?;
            Arc::new(OpenAiEmbedder::new(
                api_key,
                embedding.model.clone(),
                embedding.base_url.clone(),
                dims,
            ))
        }
        "ollama" => Arc::new(OllamaEmbedder::new(
            config.ollama.url.clone(),
            config.ollama.embedding_model.clone(),
            dims,
        )),
        other => {
            return Err(CidragError::NotConfigured(format!(
                "unknown EMBEDDING_PROVIDER '{other}' (expected openai or ollama)"
            )))
        }
    };

    info!(provider = embedder.name(), dims, "embedder ready");
    Ok(embedder)
}

/// Questions repeat far more than chunks do, so only they go through the cache.
pub fn question_embedder(config: &Config, embedder: Arc<dyn Embedder>) -> Arc<dyn Embedder> {
    match config.embedding.cache_size as usize {
        0 => embedder,
        capacity => Arc::new(CachedEmbedder::new(embedder, capacity)),
    }
}

/// The answer generator, or `None` when the LLM provider lacks credentials.
/// `/rag/query` then answers 503 while uploads keep working.
pub fn build_answer_generator(config: &Config) -> Option<AnswerGenerator> {
    match AnswerGenerator::from_config(&config.llm, &config.ollama) {
        Ok(generator) => {
            info!("answer generator ready (provider: {})", generator.provider_name());
            Some(generator)
        }
        Err(e) => {
            warn!("answer generator not available: {} (POST /rag/query disabled)", e);
            None
        }
    }
}
