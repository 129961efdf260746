//! Document ingestion: text extraction, sentence-aligned chunking, and
//! embedding providers.

pub mod document;
pub mod embedding;

pub use document::chunker::{chunk_text, ChunkError, DEFAULT_CHUNK_SIZE};
pub use document::{extract_html, extract_text, ExtractedDocument, ExtractionError};
