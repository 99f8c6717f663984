//! Small string utilities shared by the agent and the template generator.

use fancy_regex::Regex;
use std::sync::LazyLock;

const ELLIPSIS: char = '…';

/// Shorten `text` to at most `limit` characters without cutting a word.
///
/// Longer text is cut at the last space before `limit - 1` characters and an
/// ellipsis is appended. A single word longer than the limit is hard-cut.
pub fn shorten(text: &str, limit: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= limit {
        return text.to_string();
    }
    if limit == 0 {
        return String::new();
    }
    let head: String = text.chars().take(limit - 1).collect();
    let cut = match head.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => head[..idx].trim_end(),
        _ => head.as_str(),
    };
    format!("{cut}{ELLIPSIS}")
}

/// Collapse every run of non-word characters to one space.
pub fn sanitize_topic(topic: &str) -> String {
    static NON_WORD: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\W+").ok());
    let collapsed = match NON_WORD.as_ref() {
        Some(re) => re.replace_all(topic, " ").into_owned(),
        None => topic.to_string(),
    };
    collapsed.trim().to_string()
}

/// Strip a leading list marker such as `1.`, `2)`, `3/`, `-`, `*`, `•` or
/// `Variant 1:` from a line.
///
/// Numeric and bullet markers must be followed by whitespace, so text that
/// merely starts with a number ("24/7", "3-day", "1.5 million") is kept whole.
pub fn strip_list_marker(line: &str) -> &str {
    static MARKER: LazyLock<Option<Regex>> = LazyLock::new(|| {
        Regex::new(
            r"(?i)^\s*(?:(?:variant|post|option)\s*\d+\s*[:.)-]\s*|\d{1,2}[.)/]\s+|[-*•]\s+)",
        )
        .ok()
    });
    let Some(re) = MARKER.as_ref() else {
        return line.trim();
    };
    match re.find(line) {
        Ok(Some(m)) => line[m.end()..].trim(),
        _ => line.trim(),
    }
}

/// Remove one layer of matching quotes around a string.
pub fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”'), ('`', '`')] {
        if s.len() >= open.len_utf8() + close.len_utf8()
            && s.starts_with(open)
            && s.ends_with(close)
        {
            return s[open.len_utf8()..s.len() - close.len_utf8()].trim();
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(shorten("hello world", 280), "hello world");
    }

    #[test]
    fn long_text_cuts_at_word_boundary() {
        let text = "alpha beta gamma delta";
        let out = shorten(text, 12);
        assert_eq!(out, "alpha beta…");
        assert!(out.chars().count() <= 12);
    }

    #[test]
    fn never_exceeds_limit() {
        let text = "word ".repeat(100);
        let out = shorten(&text, 280);
        assert!(out.chars().count() <= 280);
        assert!(out.ends_with('…'));
        assert!(!out.contains("wor…"));
    }

    #[test]
    fn single_long_word_is_hard_cut() {
        let out = shorten(&"x".repeat(300), 280);
        assert_eq!(out.chars().count(), 280);
    }

    #[test]
    fn multibyte_text_counts_characters() {
        let text = "ünïcödé ".repeat(50);
        let out = shorten(&text, 40);
        assert!(out.chars().count() <= 40);
    }

    #[test]
    fn sanitize_collapses_punctuation() {
        assert_eq!(sanitize_topic("C++ & Rust!!"), "C Rust");
        assert_eq!(sanitize_topic("social media marketing"), "social media marketing");
    }

    #[test]
    fn list_markers_are_stripped() {
        assert_eq!(strip_list_marker("1. First post"), "First post");
        assert_eq!(strip_list_marker("2) Second"), "Second");
        assert_eq!(strip_list_marker("3/ Third"), "Third");
        assert_eq!(strip_list_marker("- dash"), "dash");
        assert_eq!(strip_list_marker("• bullet"), "bullet");
        assert_eq!(strip_list_marker("Variant 2: hi"), "hi");
        assert_eq!(strip_list_marker("No marker here"), "No marker here");
        assert_eq!(strip_list_marker("2024 was a big year"), "2024 was a big year");
    }

    #[test]
    fn leading_numbers_in_text_are_not_markers() {
        assert_eq!(
            strip_list_marker("24/7 studio access is here"),
            "24/7 studio access is here"
        );
        assert_eq!(
            strip_list_marker("3-day glaze retreat starts Monday"),
            "3-day glaze retreat starts Monday"
        );
        assert_eq!(
            strip_list_marker("1.5 million mugs thrown"),
            "1.5 million mugs thrown"
        );
        assert_eq!(
            strip_list_marker("10/10 would wedge again"),
            "10/10 would wedge again"
        );
        assert_eq!(strip_list_marker("-5 degrees in the yard"), "-5 degrees in the yard");
        assert_eq!(strip_list_marker("1. 5 glazes we love"), "5 glazes we love");
    }

    #[test]
    fn quotes_are_stripped_once() {
        assert_eq!(strip_quotes("\"hello\""), "hello");
        assert_eq!(strip_quotes("“hi”"), "hi");
        assert_eq!(strip_quotes("plain"), "plain");
        assert_eq!(strip_quotes("\""), "\"");
    }
}
