//! Fixed-width chunking.

/// Default maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Split `text` into consecutive, non-overlapping pieces of at most `max_len`
/// characters (Unicode scalar values).
///
/// Concatenating the result yields `text` again. Only the last piece may be
/// shorter than `max_len`. Empty input, or `max_len == 0`, yields no pieces.
#[must_use]
pub fn chunk_text(text: &str, max_len: usize) -> Vec<&str> {
    if text.is_empty() || max_len == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::with_capacity(text.len() / max_len + 1);
    let mut start = 0;
    let mut chars = 0;
    for (pos, _) in text.char_indices() {
        if chars == max_len {
            chunks.push(&text[start..pos]);
            start = pos;
            chars = 0;
        }
        chars += 1;
    }
    chunks.push(&text[start..]);
    chunks
}
