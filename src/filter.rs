//! Whole-word banned/promotional term detection.

use fancy_regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Promotional terms that are always disallowed, whatever the brand says.
pub const PROMO_WORDS: &[&str] = &[
    "discount",
    "sale",
    "promo",
    "coupon",
    "deal",
    "offer",
    "free",
    "save",
    "clearance",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TermKind {
    /// Listed in the caller's banned set.
    Banned,
    /// Built-in promotional term.
    Promo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermMatch {
    pub term: String,
    pub kind: TermKind,
}

impl TermMatch {
    /// Moderation issue tag, e.g. `banned:competitorX` or `promo:sale`.
    pub fn issue(&self) -> String {
        match self.kind {
            TermKind::Banned => format!("banned:{}", self.term),
            TermKind::Promo => format!("promo:{}", self.term),
        }
    }
}

/// Case-insensitive match bounded by non-word characters on both sides, so
/// `free` matches "this is free" but not "freedom", and `c++` still matches.
fn word_pattern(term: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i)(?<!\w){}(?!\w)", fancy_regex::escape(term))).ok()
}

static PROMO_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    PROMO_WORDS
        .iter()
        .filter_map(|w| word_pattern(w).map(|r| (*w, r)))
        .collect()
});

fn is_match(re: &Regex, text: &str) -> bool {
    re.is_match(text).unwrap_or(false)
}

fn already_found(matches: &[TermMatch], term: &str) -> bool {
    matches.iter().any(|m| m.term.eq_ignore_ascii_case(term))
}

/// Every banned or promotional term present in `text`, brand terms first in
/// caller order, then built-in terms. A term on both lists is reported once,
/// as banned.
pub fn find_terms(text: &str, banned: &[String]) -> Vec<TermMatch> {
    let mut matches: Vec<TermMatch> = Vec::new();

    for term in banned.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if already_found(&matches, term) {
            continue;
        }
        if word_pattern(term).is_some_and(|re| is_match(&re, text)) {
            matches.push(TermMatch {
                term: term.to_string(),
                kind: TermKind::Banned,
            });
        }
    }

    for (word, re) in PROMO_PATTERNS.iter() {
        if !already_found(&matches, word) && is_match(re, text) {
            matches.push(TermMatch {
                term: (*word).to_string(),
                kind: TermKind::Promo,
            });
        }
    }

    matches
}

/// True if `text` contains any banned term or built-in promotional term.
pub fn contains_banned(text: &str, banned: &[String]) -> bool {
    banned
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .any(|t| word_pattern(t).is_some_and(|re| is_match(&re, text)))
        || PROMO_PATTERNS.iter().any(|(_, re)| is_match(re, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(terms: &[&str]) -> Vec<String> {
        terms.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn whole_words_only() {
        assert!(!contains_banned("freedom", &set(&["free"])));
        assert!(contains_banned("this is free", &set(&["free"])));
    }

    #[test]
    fn promo_words_always_apply() {
        assert!(contains_banned("Big SALE today", &[]));
        assert!(contains_banned("Save now!", &[]));
        assert!(!contains_banned("Saved by the bell? no, salesmanship", &[]));
    }

    #[test]
    fn brand_terms_are_case_insensitive() {
        assert!(contains_banned("Better than COMPETITORX", &set(&["competitorX"])));
        assert!(!contains_banned("competitorXYZ rocks", &set(&["competitorX"])));
    }

    #[test]
    fn terms_with_symbols_match() {
        assert!(contains_banned("we love c++ here", &set(&["c++"])));
        assert!(contains_banned("get 50% off", &set(&["50% off"])));
    }

    #[test]
    fn blank_terms_are_ignored() {
        assert!(!contains_banned("anything", &set(&["", "  "])));
    }

    #[test]
    fn find_terms_tags_kinds() {
        let found = find_terms("Free coupon from Acme", &set(&["acme", "free"]));
        let issues: Vec<String> = found.iter().map(TermMatch::issue).collect();
        assert_eq!(issues, vec!["banned:acme", "banned:free", "promo:coupon"]);
    }

    #[test]
    fn find_terms_empty_on_clean_text() {
        assert!(find_terms("Thoughts on pottery?", &set(&["acme"])).is_empty());
    }
}
