//! Sentence boundary detection.

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Partition `text` into sentences.
///
/// A sentence is a run of characters closed by one or more of `.`, `!`, `?`.
/// The pieces are contiguous and cover the whole input, so concatenating them
/// gives back `text` exactly. Text after the last terminator run forms a
/// final unterminated sentence; text with no terminator is one sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }
        let next_is_terminator = chars.peek().map(|&(_, n)| is_terminator(n)).unwrap_or(false);
        if !next_is_terminator {
            let end = i + c.len_utf8();
            sentences.push(&text[start..end]);
            start = end;
        }
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}
