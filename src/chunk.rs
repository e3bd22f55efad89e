//! Overlapping fixed-size text chunker.
//!
//! Splits extracted file text into segments of at most `chunk_size`
//! characters. Cut points snap back to the nearest space or newline when one
//! exists in the last 30% of the window, so words are not split. The next
//! window starts at `max(start + chunk_size - overlap, end)`.
//!
//! Positions are counted in `char`s, not bytes.

/// Fraction of `chunk_size` a snapped cut point must reach.
const SNAP_THRESHOLD: f64 = 0.7;

/// Split `text` into trimmed, non-empty chunks.
///
/// The start of each window always moves forward, even when
/// `overlap >= chunk_size`. A `chunk_size` of zero is treated as 1.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let chunk_size = chunk_size.max(1);
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let min_break = chunk_size as f64 * SNAP_THRESHOLD;

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let mut end = (start + chunk_size).min(len);
        if end < len {
            if let Some(brk) = last_break_at_or_before(&chars, end) {
                if brk > start && (brk - start) as f64 >= min_break {
                    end = brk;
                }
            }
        }

        let piece: String = chars[start..end].iter().collect();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        start = (start + chunk_size).saturating_sub(overlap).max(end);
    }

    chunks
}

fn is_break(c: char) -> bool {
    c == ' ' || c == '\n'
}

fn last_break_at_or_before(chars: &[char], pos: usize) -> Option<usize> {
    chars[..=pos].iter().rposition(|c| is_break(*c))
}
