use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Positive size knob: zero or unparsable values fall back to the default.
fn profiled_env_size(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    pub ollama: OllamaConfig,
    pub embedding: EmbeddingConfig,
    pub content: ContentStoreConfig,
    pub aws: AwsConfig,
    pub index: IndexConfig,
    pub postgres: PostgresConfig,
    pub ingest: IngestConfig,
    pub retrieval: RetrievalConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `CIDRAG_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("CIDRAG_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            storage: StorageConfig::from_env_profiled(p),
            llm: LlmConfig::from_env_profiled(p),
            ollama: OllamaConfig::from_env_profiled(p),
            embedding: EmbeddingConfig::from_env_profiled(p),
            content: ContentStoreConfig::from_env_profiled(p),
            aws: AwsConfig::from_env_profiled(p),
            index: IndexConfig::from_env_profiled(p),
            postgres: PostgresConfig::from_env_profiled(p),
            ingest: IngestConfig::from_env_profiled(p),
            retrieval: RetrievalConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}", self.server.host, self.server.port);
        tracing::info!("  storage:     data_dir={}, knowledge_file={}", self.storage.data_dir.display(), self.storage.knowledge_file.display());
        tracing::info!("  llm:         provider={}, configured={}", self.llm.provider, self.llm.is_configured());
        tracing::info!("  embedding:   provider={}, model={}, dims={}", self.embedding.provider, self.embedding.model, self.embedding.dimensions);
        tracing::info!("  content:     backend={}, gateways={}", self.content.backend, self.content.gateways.len());
        tracing::info!("  index:       backend={}, collection={}", self.index.backend, self.index.chroma_collection);
        tracing::info!(
            "  ingest:      text={} pdf={} url={} concurrency={}",
            self.ingest.text_chunk_size, self.ingest.pdf_chunk_size, self.ingest.url_chunk_size, self.ingest.concurrency
        );
        tracing::info!("  retrieval:   top_k={}", self.retrieval.top_k);
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    /// Upper bound for multipart uploads, in bytes.
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 3000),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
            max_upload_bytes: profiled_env_size(p, "MAX_UPLOAD_BYTES", 100 * 1024 * 1024),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Text file ingested when `/rag/upload` is called without a body.
    pub knowledge_file: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        let data_dir = PathBuf::from(profiled_env_or(p, "DATA_DIR", "data"));
        let knowledge_file = PathBuf::from(profiled_env_or(
            p,
            "KNOWLEDGE_FILE",
            data_dir.join("knowledge.txt").to_str().unwrap_or("data/knowledge.txt"),
        ));
        Self {
            data_dir,
            knowledge_file,
        }
    }
}

// ── LLM (Mistral / OpenAI / Anthropic) ───────────────────────

pub const MISTRAL_BASE_URL: &str = "https://api.mistral.ai";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "mistral", "openai", "anthropic", "ollama"
    pub provider: String,
    pub mistral_api_key: Option<String>,
    pub mistral_model: String,
    pub mistral_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", "mistral"),
            mistral_api_key: profiled_env_opt(p, "MISTRAL_API_KEY"),
            mistral_model: profiled_env_or(p, "MISTRAL_MODEL", "open-mistral-nemo"),
            mistral_base_url: profiled_env_or(p, "MISTRAL_BASE_URL", MISTRAL_BASE_URL),
            openai_api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            openai_model: profiled_env_or(p, "OPENAI_MODEL", "gpt-4o-mini"),
            openai_base_url: profiled_env_opt(p, "OPENAI_BASE_URL"),
            anthropic_api_key: profiled_env_opt(p, "ANTHROPIC_API_KEY"),
            anthropic_model: profiled_env_or(p, "ANTHROPIC_MODEL", "claude-sonnet-4-5-20250929"),
            temperature: profiled_env_or(p, "LLM_TEMPERATURE", "0.7")
                .parse()
                .unwrap_or(0.7),
            max_tokens: profiled_env_u32(p, "LLM_MAX_TOKENS", 200),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.to_lowercase().as_str() {
            "mistral" => self.mistral_api_key.is_some(),
            "openai" => self.openai_api_key.is_some(),
            "anthropic" | "claude" => self.anthropic_api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub embedding_model: String,
}

impl OllamaConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "OLLAMA_URL", "http://localhost:11434"),
            model: profiled_env_or(p, "OLLAMA_MODEL", "llama3.2"),
            embedding_model: profiled_env_or(p, "OLLAMA_EMBEDDING_MODEL", "nomic-embed-text"),
        }
    }
}

// ── Embedding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "openai", "ollama"
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub dimensions: u32,
    pub batch_size: u32,
    /// LRU capacity for question embeddings (0 disables the cache).
    pub cache_size: u32,
}

impl EmbeddingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "EMBEDDING_PROVIDER", "openai"),
            model: profiled_env_or(p, "EMBEDDING_MODEL", "text-embedding-ada-002"),
            api_key: profiled_env_opt(p, "EMBEDDING_API_KEY")
                .or_else(|| profiled_env_opt(p, "OPENAI_API_KEY")),
            base_url: profiled_env_opt(p, "EMBEDDING_BASE_URL"),
            dimensions: profiled_env_u32(p, "EMBEDDING_DIMENSIONS", 1536),
            batch_size: profiled_env_u32(p, "EMBEDDING_BATCH_SIZE", 64).max(1),
            cache_size: profiled_env_u32(p, "EMBEDDING_CACHE_SIZE", 256),
        }
    }
}

// ── Content-addressed store ───────────────────────────────────

pub const DEFAULT_GATEWAYS: &[&str] = &[
    "https://{cid}.ipfs.w3s.link/{filename}",
    "https://ipfs.io/ipfs/{cid}/{filename}",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentStoreConfig {
    /// "ipfs", "local", "s3"
    pub backend: String,
    pub ipfs_api_url: String,
    pub ipfs_api_token: Option<String>,
    /// Gateway URL templates with `{cid}` and `{filename}` placeholders, in priority order.
    pub gateways: Vec<String>,
    pub gateway_max_attempts: u32,
    pub gateway_retry_delay_ms: u64,
    pub gateway_timeout_ms: u64,
}

impl ContentStoreConfig {
    fn from_env_profiled(p: &str) -> Self {
        let gateways = profiled_env_opt(p, "GATEWAYS")
            .map(|raw| parse_list(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| DEFAULT_GATEWAYS.iter().map(|s| s.to_string()).collect());
        Self {
            backend: profiled_env_or(p, "CONTENT_STORE", "ipfs"),
            ipfs_api_url: profiled_env_or(p, "IPFS_API_URL", "http://localhost:5001"),
            ipfs_api_token: profiled_env_opt(p, "IPFS_API_TOKEN"),
            gateways,
            gateway_max_attempts: profiled_env_u32(p, "GATEWAY_MAX_ATTEMPTS", 3).max(1),
            gateway_retry_delay_ms: profiled_env_u64(p, "GATEWAY_RETRY_DELAY_MS", 1000),
            gateway_timeout_ms: profiled_env_u64(p, "GATEWAY_TIMEOUT_MS", 7000),
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

// ── AWS / S3 (content store "s3" backend) ────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_prefix: Option<String>,
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            region: profiled_env_or(p, "AWS_REGION", "us-east-1"),
            access_key_id: profiled_env_opt(p, "AWS_ACCESS_KEY_ID"),
            secret_access_key: profiled_env_opt(p, "AWS_SECRET_ACCESS_KEY"),
            s3_bucket: profiled_env_opt(p, "S3_BUCKET"),
            s3_prefix: profiled_env_opt(p, "S3_PREFIX"),
            endpoint_url: profiled_env_opt(p, "AWS_ENDPOINT_URL"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.s3_bucket.is_some()
    }
}

// ── Vector index ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// "chroma", "pgvector", "memory"
    pub backend: String,
    pub chroma_url: String,
    pub chroma_collection: String,
}

impl IndexConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            backend: profiled_env_or(p, "VECTOR_INDEX", "chroma"),
            chroma_url: profiled_env_or(p, "CHROMA_URL", "http://localhost:8000"),
            chroma_collection: profiled_env_or(p, "CHROMA_COLLECTION", "rag_chunks"),
        }
    }
}

// ── PostgreSQL (pgvector index backend) ──────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_u16(p, "PG_PORT", 5432),
            database: profiled_env_or(p, "PG_DATABASE", "cidrag"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_u32(p, "PG_MAX_CONNECTIONS", 10),
        }
    }

    pub fn connection_string(&self) -> String {
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }
}

// ── Ingestion ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub text_chunk_size: usize,
    pub pdf_chunk_size: usize,
    pub url_chunk_size: usize,
    /// Chunks stored and indexed in parallel per upload.
    pub concurrency: usize,
    pub url_fetch_timeout_ms: u64,
}

impl IngestConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            text_chunk_size: profiled_env_size(p, "TEXT_CHUNK_SIZE", 3000),
            pdf_chunk_size: profiled_env_size(p, "PDF_CHUNK_SIZE", 3000),
            url_chunk_size: profiled_env_size(p, "URL_CHUNK_SIZE", 12000),
            concurrency: profiled_env_size(p, "INGEST_CONCURRENCY", 4),
            url_fetch_timeout_ms: profiled_env_u64(p, "URL_FETCH_TIMEOUT_MS", 15000),
        }
    }
}

// ── Retrieval ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl RetrievalConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            top_k: profiled_env_size(p, "RETRIEVAL_TOP_K", 1),
        }
    }
}
