//! Bubble text tokenization
//!
//! Splits message text on whitespace and marks the words that look like
//! links so the surface can render them as clickable.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Optional scheme, then a host name or dotted quad, optional port and path.
/// Anchored at the start only: a word is a link when it begins with one, so
/// trailing punctuation such as `example.com,` still counts.
const LINK_PATTERN: &str = r"(?i)^(?:(?:http|ftp)s?://)?(?:(?:[-a-z0-9]+\.)+[-a-z0-9]{2,}|(?:[0-9]{1,3}\.){3}[0-9]{1,3})(?::[1-9][0-9]{0,4})?(?:/[-a-z0-9/%~@&_+=;:,.?#]*[a-z0-9/])?";

static LINK: OnceLock<Option<Regex>> = OnceLock::new();

fn link_regex() -> Option<&'static Regex> {
    LINK.get_or_init(|| match Regex::new(LINK_PATTERN) {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!(error = %e, "Link pattern failed to compile, links render as plain words");
            None
        }
    })
    .as_ref()
}

/// One whitespace-separated piece of bubble text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextSpan {
    Word(String),
    Link(String),
}

impl TextSpan {
    pub fn as_str(&self) -> &str {
        match self {
            TextSpan::Word(text) | TextSpan::Link(text) => text,
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self, TextSpan::Link(_))
    }
}

/// Whether `word` looks like a URL
pub fn is_link(word: &str) -> bool {
    link_regex().is_some_and(|regex| regex.is_match(word))
}

/// Split `text` into word and link spans
pub fn tokenize(text: &str) -> Vec<TextSpan> {
    text.split_whitespace()
        .map(|word| {
            if is_link(word) {
                TextSpan::Link(word.to_string())
            } else {
                TextSpan::Word(word.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_are_detected() {
        for word in [
            "example.com",
            "http://example.com",
            "https://example.org/path?q=1",
            "ftp://files.example.net:2121/pub",
            "192.168.1.10:8080",
            "www.example.co.uk.",
            "example.com,",
            "example.museum",
        ] {
            assert!(is_link(word), "{} should be a link", word);
        }
    }

    #[test]
    fn test_plain_words_are_not_links() {
        for word in ["hello", "e.g.", "http://", "node_modules", "a..b", "(example.com)"] {
            assert!(!is_link(word), "{} should not be a link", word);
        }
    }

    #[test]
    fn test_tokenize_marks_spans() {
        let spans = tokenize("see  https://example.org now");
        assert_eq!(
            spans,
            vec![
                TextSpan::Word("see".to_string()),
                TextSpan::Link("https://example.org".to_string()),
                TextSpan::Word("now".to_string()),
            ]
        );
        assert!(tokenize("   ").is_empty());
    }
}
