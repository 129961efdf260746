use serde::{Deserialize, Serialize};

/// Content identifier returned by the content-addressed store.
pub type Cid = String;

/// Number of characters of a chunk echoed back in upload responses.
pub const PREVIEW_CHARS: usize = 120;

/// The JSON object persisted for every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkObject {
    pub id: String,
    pub content: String,
}

impl ChunkObject {
    /// Build the object for the chunk at `index` (0-based) of an upload.
    pub fn for_index(index: usize, content: impl Into<String>) -> Self {
        Self {
            id: format!("chunk-{index}"),
            content: content.into(),
        }
    }
}

/// Metadata indexed alongside each chunk embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub index: usize,
    pub filename: String,
}

impl ChunkMetadata {
    pub fn for_index(index: usize) -> Self {
        Self {
            index,
            filename: chunk_filename(index),
        }
    }
}

/// Filename under which chunk `index` is stored: `chunk-{index}.json`.
pub fn chunk_filename(index: usize) -> String {
    format!("chunk-{index}.json")
}

/// First [`PREVIEW_CHARS`] characters of `content`.
pub fn preview(content: &str) -> String {
    content.chars().take(PREVIEW_CHARS).collect()
}
