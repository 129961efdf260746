pub mod cache;
pub mod ollama;
pub mod openai;
pub mod traits;

pub use cache::{CachedEmbedder, EmbeddingCache};
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use traits::{embed_one, Embedder, EmbeddingError};
