//! Turn free-form model output into variants, scores, hashtags and alt text.

use crate::text::{shorten, strip_list_marker, strip_quotes};
use fancy_regex::Regex;
use std::sync::LazyLock;

/// Most hashtags kept from one suggestion.
pub const MAX_HASHTAGS: usize = 6;

/// A line made only of array punctuation, such as `[` or `],`.
fn is_bracket_only(line: &str) -> bool {
    line.chars()
        .all(|c| matches!(c, '[' | ']' | '{' | '}' | ',') || c.is_whitespace())
}

/// Content lines with list markers, trailing commas and wrapping quotes
/// removed. A JSON string array is taken item by item. Blank, fence and
/// bracket-only lines are skipped, and a line ending in `:` is dropped as an
/// introduction only when more content follows it.
fn content_lines(text: &str) -> Vec<String> {
    let body = text
        .lines()
        .filter(|l| !l.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");

    if let Ok(items) = serde_json::from_str::<Vec<String>>(body.trim()) {
        return items
            .iter()
            .map(|item| strip_quotes(strip_list_marker(item)).to_string())
            .filter(|item| !item.is_empty())
            .collect();
    }

    let lines: Vec<&str> = body
        .lines()
        .map(strip_list_marker)
        .filter(|l| !is_bracket_only(l))
        .map(|l| strip_quotes(l.strip_suffix(',').unwrap_or(l)))
        .filter(|l| !l.is_empty())
        .collect();
    let last = lines.len().saturating_sub(1);
    lines
        .into_iter()
        .enumerate()
        .filter(|&(idx, line)| idx == last || !line.ends_with(':'))
        .map(|(_, line)| line.to_string())
        .collect()
}

/// Up to `limit` distinct posts, one per content line, each capped at `max_chars`.
pub fn variants(text: &str, limit: usize, max_chars: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for line in content_lines(text) {
        let post = shorten(&line, max_chars);
        if out.iter().any(|v| v.eq_ignore_ascii_case(&post)) {
            continue;
        }
        out.push(post);
        if out.len() == limit {
            break;
        }
    }
    out
}

/// A single post: the first content line.
pub fn single_post(text: &str, max_chars: usize) -> Option<String> {
    content_lines(text)
        .first()
        .map(|line| shorten(line, max_chars))
}

/// First ASCII integer in the critique, clamped to 0..=10.
pub fn score(text: &str) -> Option<u8> {
    static NUMBER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[0-9]+").ok());
    let m = NUMBER.as_ref()?.find(text).ok()??;
    let n: u64 = m.as_str().parse().unwrap_or(u64::MAX);
    Some(n.min(10) as u8)
}

fn hashtag_body(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Hashtags from a comma, semicolon or newline separated suggestion.
///
/// Pieces that already contain `#tags` contribute each of them; plain phrases
/// are joined into one tag. Numeric-only and repeated tags are dropped.
pub fn hashtags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut push = |body: String| {
        if body.is_empty()
            || body.chars().all(|c| c.is_ascii_digit())
            || tags.iter().any(|t| t[1..].eq_ignore_ascii_case(&body))
            || tags.len() >= MAX_HASHTAGS
        {
            return;
        }
        tags.push(format!("#{body}"));
    };

    for piece in text.split([',', ';', '\n']) {
        let piece = strip_list_marker(piece);
        if piece.contains('#') {
            for word in piece.split_whitespace().filter(|w| w.starts_with('#')) {
                push(hashtag_body(word));
            }
        } else {
            let body: String = piece.split_whitespace().map(hashtag_body).collect();
            push(body);
        }
    }
    tags
}

/// First content line, without an "Alt text:" label.
pub fn alt_text(text: &str) -> Option<String> {
    const LABEL: &str = "alt text:";
    text.lines()
        .map(|l| {
            let l = strip_quotes(l);
            match l.get(..LABEL.len()) {
                Some(head) if head.eq_ignore_ascii_case(LABEL) => strip_quotes(&l[LABEL.len()..]),
                _ => l,
            }
        })
        .find(|l| !l.is_empty())
        .map(String::from)
}
