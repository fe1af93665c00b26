//! Text chunking with a fixed-size sliding window.
//!
//! Offsets and lengths are counted in `char`s, so a window never splits a
//! UTF-8 code point.

/// Window length in characters.
pub const CHUNK_SIZE: usize = 500;

/// Characters shared between consecutive windows.
pub const CHUNK_OVERLAP: usize = 50;

/// Distance between consecutive window starts.
pub const CHUNK_STRIDE: usize = CHUNK_SIZE - CHUNK_OVERLAP;

/// Half-open `[start, end)` char offsets of every window over a text of
/// `len` characters.
///
/// For `len > CHUNK_OVERLAP` this yields `ceil((len - overlap) / stride)`
/// windows; for shorter, non-empty texts a single window. The loop stops at
/// the window that reaches the end of the text rather than once the start
/// passes it, so no tail window lies entirely inside the previous overlap.
pub fn chunk_spans(len: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;

    while start < len {
        let end = (start + CHUNK_SIZE).min(len);
        spans.push((start, end));
        if end == len {
            break;
        }
        start += CHUNK_STRIDE;
    }

    spans
}

/// Split text into overlapping chunks.
///
/// Each window is trimmed of surrounding whitespace and dropped if nothing
/// remains.
pub fn chunk_text(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();

    let chunks: Vec<String> = chunk_spans(chars.len())
        .into_iter()
        .filter_map(|(start, end)| {
            let window: String = chars[start..end].iter().collect();
            let trimmed = window.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect();

    tracing::debug!(
        "Chunked {} chars into {} chunks (size: {}, overlap: {})",
        chars.len(),
        chunks.len(),
        CHUNK_SIZE,
        CHUNK_OVERLAP
    );

    chunks
}
