//! Text normalization applied before chunking, plus display helpers.

use tracing::debug;

/// Normalizes raw document text so chunk boundaries are stable.
///
/// - `\r\n` and lone `\r` become `\n`.
/// - Runs of horizontal whitespace collapse to a single space; lines are trimmed.
/// - Three or more consecutive newlines collapse to one blank line.
/// - Leading and trailing whitespace is removed.
pub fn preprocess_text(s: &str) -> String {
    let unified = s.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;

    for line in unified.split('\n') {
        let line = collapse_spaces(line);

        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }

        out.push_str(&line);
        out.push('\n');
    }

    let trimmed = out.trim().to_string();
    debug!(input_len = s.len(), output_len = trimmed.len(), "preprocess_text");
    trimmed
}

fn collapse_spaces(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clamps `s` to `max_chars` characters, appending `...` when cut.
pub fn preview(s: &str, max_chars: usize) -> String {
    let mut it = s.char_indices();
    match it.nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &s[..byte_idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_line_endings_and_spacing() {
        let raw = "  Title\r\n\r\n\r\n\r\nBody \t  text\rnext   line  ";
        assert_eq!(preprocess_text(raw), "Title\n\nBody text\nnext line");
    }

    #[test]
    fn keeps_single_blank_lines() {
        assert_eq!(preprocess_text("a\n\nb"), "a\n\nb");
        assert_eq!(preprocess_text("   \n\t\n"), "");
    }

    #[test]
    fn preview_clamps_on_char_boundary() {
        assert_eq!(preview("héllo", 10), "héllo");
        assert_eq!(preview("héllo", 2), "hé...");
        assert_eq!(preview("abc", 3), "abc");
    }
}
