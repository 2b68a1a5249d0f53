#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// A contiguous piece of a document, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The trimmed chunk text
    pub text: String,
    /// Identifier of the document this chunk came from (usually its path)
    pub source: String,
    /// Ordinal position of this chunk within its document
    pub index: usize,
    /// Length of `text` in characters
    pub char_count: usize,
}

/// Configuration for text chunking, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target window size
    pub chunk_size: usize,
    /// How far each window reaches back into the previous one
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Split `text` into overlapping chunks of at most `chunk_size` characters.
///
/// Each window's right edge is pulled back to the last `.` past the window
/// midpoint, or failing that the last space past the midpoint, or left at the
/// raw boundary. Chunks are trimmed and empty ones dropped. The next window
/// starts `overlap` characters before the previous (unclamped) end, but
/// always moves forward; splitting stops once a window would start past the
/// end of the text, so a short overlapping tail chunk is usually emitted.
#[inline]
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    if len <= chunk_size || chunk_size == 0 {
        let trimmed = text.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        };
    }

    let midpoint = chunk_size / 2;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        // The raw edge may run past the text; only the slice is clamped
        let mut end = start + chunk_size;

        if end < len {
            let window = &chars[start..end];
            if let Some(dot) = rposition(window, '.').filter(|&pos| pos > midpoint) {
                end = start + dot + 1;
            } else if let Some(space) = rposition(window, ' ').filter(|&pos| pos > midpoint) {
                end = start + space;
            }
        }

        let chunk: String = chars[start..end.min(len)].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        let next = end.saturating_sub(overlap);
        start = if next <= start { end } else { next };
    }

    debug!(
        "Split {} characters into {} chunks (size {}, overlap {})",
        len,
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

/// Chunk a whole document and attach per-chunk metadata
#[inline]
pub fn chunk_document(source: &str, text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    chunk_text(text, config.chunk_size, config.overlap)
        .into_iter()
        .enumerate()
        .map(|(index, text)| TextChunk {
            char_count: text.chars().count(),
            text,
            source: source.to_string(),
            index,
        })
        .collect()
}

fn rposition(window: &[char], needle: char) -> Option<usize> {
    window.iter().rposition(|&c| c == needle)
}
