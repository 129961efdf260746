//! Sentence-aligned text chunking.
//!
//! Splits text into an ordered sequence of chunks that never cut a sentence in
//! half. Sentences are accumulated until adding the next one would push the
//! chunk past `chunk_size` characters; a single sentence longer than the limit
//! is emitted on its own.

mod sentences;
mod types;

pub use sentences::split_sentences;
pub use types::{ChunkError, DEFAULT_CHUNK_SIZE};

/// Split `text` into trimmed, non-empty chunks of at most `chunk_size`
/// characters (measured before trimming).
///
/// Empty or whitespace-only input yields no chunks. A `chunk_size` of zero is
/// rejected with [`ChunkError::InvalidChunkSize`].
pub fn chunk_text(text: &str, chunk_size: usize) -> Result<Vec<String>, ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::InvalidChunkSize(chunk_size));
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(text) {
        let sentence_len = sentence.chars().count();
        if current_len + sentence_len > chunk_size {
            flush(&mut chunks, &current);
            current.clear();
            current_len = 0;
        }
        current.push_str(sentence);
        current_len += sentence_len;
    }
    flush(&mut chunks, &current);

    Ok(chunks)
}

fn flush(chunks: &mut Vec<String>, current: &str) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
