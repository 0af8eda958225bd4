//! Text segmentation into overlapping, source-attributed chunks.
//!
//! Documents are split into fragments of at most `chunk_size` characters.
//! When a natural boundary (paragraph break, then sentence break) exists in
//! the back half of the window, the cut moves there instead of splitting
//! mid-sentence; adjacent chunks overlap by `overlap` characters so retrieval
//! never loses context at a seam. Sizes count Unicode scalar values, not
//! bytes, and every cut lands on a char boundary.

/// Default target chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default overlap between adjacent chunks in characters.
pub const DEFAULT_OVERLAP: usize = 50;

/// A bounded fragment of a document's text.
///
/// `position` is a zero-based sequence number unique within `source`,
/// assigned at segmentation time and never renumbered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub position: usize,
}

/// Sentence separators, in priority order. The first separator with an
/// occurrence past the minimum fragment size wins.
const SENTENCE_SEPARATORS: [[char; 2]; 4] = [['.', ' '], ['.', '\n'], ['?', ' '], ['!', '\n']];

/// Splits `text` into overlapping chunks attributed to `source`.
///
/// Empty or whitespace-only input produces no chunks, as does a zero
/// `chunk_size`. The effective overlap is clamped to `chunk_size / 2`, the
/// largest value that still guarantees strict forward progress once the
/// minimum-fragment rule is in play.
pub fn segment(text: &str, source: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    if chunk_size == 0 || text.trim().is_empty() {
        return Vec::new();
    }
    let overlap = overlap.min(chunk_size / 2);

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut position = 0;

    while start < total {
        // Tentative end is left unclamped: the final cursor advance works off
        // it, which is what terminates the loop after the last fragment.
        let mut end = start + chunk_size;

        if end < total {
            let min_end = start + chunk_size / 2;
            match rfind_pair(&chars, start, end, ['\n', '\n']) {
                Some(brk) if brk > min_end => end = brk + 2,
                _ => {
                    for separator in SENTENCE_SEPARATORS {
                        if let Some(brk) = rfind_pair(&chars, start, end, separator) {
                            if brk > min_end {
                                end = brk + 2;
                                break;
                            }
                        }
                    }
                }
            }
        }

        let piece: String = chars[start..end.min(total)].iter().collect();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            chunks.push(Chunk {
                text: trimmed.to_string(),
                source: source.to_string(),
                position,
            });
            position += 1;
        }

        start = end - overlap;
    }

    chunks
}

/// Segments with the default size and overlap.
pub fn segment_default(text: &str, source: &str) -> Vec<Chunk> {
    segment(text, source, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP)
}

/// Finds the last occurrence of a two-char separator fully inside
/// `[start, end)`, returning the index of its first char.
fn rfind_pair(chars: &[char], start: usize, end: usize, pair: [char; 2]) -> Option<usize> {
    let window_end = end.min(chars.len());
    if window_end < start + 2 {
        return None;
    }
    (start..=window_end - 2)
        .rev()
        .find(|&i| chars[i] == pair[0] && chars[i + 1] == pair[1])
}
