//! Chunking limits and errors.

use thiserror::Error;

/// Chunk size used when a caller has no size policy of its own.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Rejected chunking parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk size must be a positive integer, got {0}")]
    InvalidChunkSize(usize),
}
