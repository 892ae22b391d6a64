mod analyzer;
mod buckets;
mod classifier;
#[cfg(feature = "huggingface")]
mod huggingface;
mod keywords;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use analyzer::{Classification, EmotionAnalyzer, EmotionError, LabelSource};
pub use buckets::{ClassificationScore, ScoreBucket, ScoreBuckets};
pub use classifier::{ClassifierError, FixedScoreClassifier, RawSentiment, SentimentClassifier};
#[cfg(feature = "huggingface")]
pub use huggingface::HuggingFaceClassifier;
pub use keywords::{KeywordMatch, KeywordRule, KeywordTable};

/// The closed set of labels a span can receive.
///
/// The first group is produced by keyword rules, the second by bucketing a
/// classifier score. Both groups share one type so every consumer has to
/// handle every label.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EmotionLabel {
    Happiness,
    Sadness,
    Anger,
    Fear,
    Disgust,
    Surprise,
    VeryPositive,
    Positive,
    Neutral,
    Negative,
    VeryNegative,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Valence {
    Positive,
    Neutral,
    Negative,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 11] = [
        EmotionLabel::Happiness,
        EmotionLabel::Sadness,
        EmotionLabel::Anger,
        EmotionLabel::Fear,
        EmotionLabel::Disgust,
        EmotionLabel::Surprise,
        EmotionLabel::VeryPositive,
        EmotionLabel::Positive,
        EmotionLabel::Neutral,
        EmotionLabel::Negative,
        EmotionLabel::VeryNegative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Happiness => "happiness",
            EmotionLabel::Sadness => "sadness",
            EmotionLabel::Anger => "anger",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::VeryPositive => "very_positive",
            EmotionLabel::Positive => "positive",
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Negative => "negative",
            EmotionLabel::VeryNegative => "very_negative",
        }
    }

    /// Human-facing name, e.g. `Very Positive`.
    pub fn title(&self) -> &'static str {
        match self {
            EmotionLabel::Happiness => "Happiness",
            EmotionLabel::Sadness => "Sadness",
            EmotionLabel::Anger => "Anger",
            EmotionLabel::Fear => "Fear",
            EmotionLabel::Disgust => "Disgust",
            EmotionLabel::Surprise => "Surprise",
            EmotionLabel::VeryPositive => "Very Positive",
            EmotionLabel::Positive => "Positive",
            EmotionLabel::Neutral => "Neutral",
            EmotionLabel::Negative => "Negative",
            EmotionLabel::VeryNegative => "Very Negative",
        }
    }

    pub fn valence(&self) -> Valence {
        match self {
            EmotionLabel::Happiness
            | EmotionLabel::Surprise
            | EmotionLabel::VeryPositive
            | EmotionLabel::Positive => Valence::Positive,
            EmotionLabel::Neutral => Valence::Neutral,
            EmotionLabel::Sadness
            | EmotionLabel::Anger
            | EmotionLabel::Fear
            | EmotionLabel::Disgust
            | EmotionLabel::Negative
            | EmotionLabel::VeryNegative => Valence::Negative,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == normalized)
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
