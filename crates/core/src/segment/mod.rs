use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters that end a sentence-like span.
///
/// Covers Latin terminals plus the Arabic/Urdu full stop and question mark,
/// the Devanagari danda pair and the full-width CJK forms, so mixed-script
/// input segments the same way as plain ASCII.
pub const SENTENCE_TERMINALS: &[char] = &[
    '.', '!', '?', '\u{06D4}', '\u{061F}', '\u{0964}', '\u{0965}', '\u{3002}', '\u{FF01}',
    '\u{FF1F}',
];

/// A non-empty, trimmed piece of input text.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TextSpan(String);

impl TextSpan {
    /// Trims `raw` and returns `None` if nothing is left.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn word_count(&self) -> usize {
        self.0.split_whitespace().count()
    }
}

impl fmt::Display for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TextSpan {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn is_sentence_terminal(c: char) -> bool {
    SENTENCE_TERMINALS.contains(&c)
}

/// Splits `text` into spans in input order. Terminal punctuation is dropped
/// and whitespace-only pieces are discarded.
pub fn segment(text: &str) -> Vec<TextSpan> {
    text.split(is_sentence_terminal)
        .filter_map(TextSpan::new)
        .collect()
}
