use crate::segment::TextSpan;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_PER_WORD_MS: u64 = 500;
pub const DEFAULT_MIN_MS: u64 = 2000;
pub const DEFAULT_MAX_MS: u64 = 5000;

/// How long a frame stays on screen, in milliseconds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DisplayDuration(u64);

impl DisplayDuration {
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }

    /// For consumers that work in seconds, such as video frame-rate math.
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

/// `word_count * per_word_ms`, clamped to `[min_ms, max_ms]`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DurationPolicy {
    pub per_word_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for DurationPolicy {
    fn default() -> Self {
        Self {
            per_word_ms: DEFAULT_PER_WORD_MS,
            min_ms: DEFAULT_MIN_MS,
            max_ms: DEFAULT_MAX_MS,
        }
    }
}

impl DurationPolicy {
    pub fn duration(&self, span: &TextSpan) -> DisplayDuration {
        self.for_word_count(span.word_count())
    }

    pub fn for_word_count(&self, words: usize) -> DisplayDuration {
        let words = u64::try_from(words).unwrap_or(u64::MAX);
        let raw = words.saturating_mul(self.per_word_ms);
        DisplayDuration(raw.max(self.min_ms).min(self.max_ms))
    }
}
