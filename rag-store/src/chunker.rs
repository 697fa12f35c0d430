//! Character-based chunker with boundary snapping.
//!
//! Each fragment ends at the best boundary inside a tolerance window that
//! reaches back `chunk_size / 2` characters from the hard limit:
//! paragraph break, then sentence end, then whitespace, then a hard cut.
//! Consecutive fragments overlap by exactly `overlap` characters.

use crate::errors::{RagError, Result};

/// Sentence terminators recognised at a boundary (must be followed by whitespace).
const SENTENCE_END: [char; 3] = ['.', '!', '?'];

/// Splits `text` into ordered, trimmed fragments.
///
/// Empty or whitespace-only input yields an empty vector.
///
/// # Errors
/// [`RagError::InvalidConfiguration`] when `chunk_size == 0` or `overlap >= chunk_size`.
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    let chars: Vec<char> = text.chars().collect();
    let spans = chunk_spans(text, chunk_size, overlap)?;
    Ok(spans
        .into_iter()
        .map(|(s, e)| chars[s..e].iter().collect::<String>().trim().to_string())
        .filter(|f| !f.is_empty())
        .collect())
}

/// Fragment boundaries as `(start, end)` character offsets, end exclusive.
///
/// The spans are untrimmed; they cover the whole input without gaps.
pub fn chunk_spans(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<(usize, usize)>> {
    validate(chunk_size, overlap)?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut spans = Vec::new();
    let mut start = 0usize;

    loop {
        let hard_end = (start + chunk_size).min(n);
        let end = if hard_end == n {
            n
        } else {
            let floor = (start + overlap + 1).max(hard_end.saturating_sub(chunk_size / 2));
            snap_boundary(&chars, floor, hard_end)
        };
        spans.push((start, end));
        if end >= n {
            break;
        }
        // end > start + overlap, so every step makes progress.
        start = end - overlap;
    }

    Ok(spans)
}

/// Validates chunker parameters.
pub fn validate(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::InvalidConfiguration(
            "chunk_size must be > 0".into(),
        ));
    }
    if overlap >= chunk_size {
        return Err(RagError::InvalidConfiguration(format!(
            "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Picks a cut position in `floor..=hard_end`, latest position per preference class.
/// Requires `hard_end < chars.len()`.
fn snap_boundary(chars: &[char], floor: usize, hard_end: usize) -> usize {
    let candidates = || (floor..=hard_end).rev();

    let paragraph = candidates().find(|&c| c >= 2 && chars[c - 1] == '\n' && chars[c - 2] == '\n');
    if let Some(c) = paragraph {
        return c;
    }

    let sentence = candidates()
        .find(|&c| c >= 1 && SENTENCE_END.contains(&chars[c - 1]) && chars[c].is_whitespace());
    if let Some(c) = sentence {
        return c;
    }

    let space = candidates().find(|&c| chars[c].is_whitespace());
    space.unwrap_or(hard_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTH_DOC: &str =
        "Auth: use Bearer tokens in the Authorization header. Rate limit: 100/hr.";

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(matches!(
            chunk("abc", 10, 10),
            Err(RagError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            chunk("abc", 0, 0),
            Err(RagError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn blank_input_yields_nothing() {
        assert!(chunk("", 50, 10).unwrap().is_empty());
        assert!(chunk("  \n\t ", 50, 10).unwrap().is_empty());
    }

    #[test]
    fn short_text_is_single_fragment() {
        assert_eq!(chunk("  hello world ", 50, 10).unwrap(), vec!["hello world"]);
    }

    #[test]
    fn auth_example_snaps_to_word_boundary() {
        let frags = chunk(AUTH_DOC, 50, 10).unwrap();
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0], "Auth: use Bearer tokens in the Authorization");
        assert!(frags[1].ends_with("Rate limit: 100/hr."));
    }

    #[test]
    fn prefers_sentence_end_over_plain_space() {
        let text = "First sentence is here. Then more words follow on";
        let spans = chunk_spans(text, 30, 5).unwrap();
        let first: String = text.chars().take(spans[0].1).collect();
        assert_eq!(first, "First sentence is here.");
    }

    #[test]
    fn prefers_paragraph_break() {
        let text = "Intro line one.\n\nSecond paragraph keeps going and going.";
        let frags = chunk(text, 25, 3).unwrap();
        assert_eq!(frags[0], "Intro line one.");
    }

    #[test]
    fn hard_cut_without_boundaries() {
        let text = "x".repeat(95);
        let spans = chunk_spans(&text, 40, 8).unwrap();
        assert_eq!(spans, vec![(0, 40), (32, 72), (64, 95)]);
    }

    #[test]
    fn spans_cover_text_with_bounded_size_and_overlap() {
        let text = "Lorem ipsum dolor sit amet. Consectetur adipiscing elit!\n\n\
                    Sed do eiusmod tempor incididunt? Ut labore et dolore magna aliqua. \
                    Ut enim ad minim veniam, quis nostrud exercitation ullamco.";
        let n = text.chars().count();
        for (size, overlap) in [(20, 0), (20, 5), (33, 10), (64, 63), (200, 50)] {
            let spans = chunk_spans(text, size, overlap).unwrap();
            assert_eq!(spans[0].0, 0);
            assert_eq!(spans.last().unwrap().1, n);
            for w in spans.windows(2) {
                // next fragment starts exactly `overlap` chars before the previous end
                assert_eq!(w[1].0 + overlap, w[0].1);
                assert!(w[1].0 > w[0].0);
            }
            for (s, e) in &spans {
                assert!(e - s <= size, "span {s}..{e} exceeds {size}");
            }
        }
    }

    #[test]
    fn deterministic() {
        let a = chunk(AUTH_DOC, 20, 4).unwrap();
        let b = chunk(AUTH_DOC, 20, 4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "ünïcödé ".repeat(10);
        let spans = chunk_spans(&text, 16, 4).unwrap();
        assert!(spans.iter().all(|(s, e)| e - s <= 16));
        assert!(!chunk(&text, 16, 4).unwrap().is_empty());
    }
}
