use crate::emotion::EmotionLabel;
use crate::segment::TextSpan;
use serde::{Deserialize, Serialize};

/// One entry of the keyword table: a label and the substrings that trigger it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordRule {
    pub label: EmotionLabel,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(label: EmotionLabel, keywords: &[&str]) -> Self {
        Self {
            label,
            keywords: keywords.iter().map(|k| (*k).to_owned()).collect(),
        }
    }

    /// Built-in table. Rules are checked top to bottom, so a span that
    /// mentions both "happy" and "angry" is `Happiness`.
    pub fn default_table() -> Vec<Self> {
        vec![
            Self::new(
                EmotionLabel::Happiness,
                &["happy", "joy", "excited", "glad", "delighted", "love"],
            ),
            Self::new(
                EmotionLabel::Sadness,
                &["sad", "depressed", "unhappy", "miserable", "heartbroken"],
            ),
            Self::new(EmotionLabel::Anger, &["angry", "mad", "furious", "annoyed"]),
            Self::new(EmotionLabel::Fear, &["scared", "afraid", "fear", "terrified"]),
            Self::new(EmotionLabel::Disgust, &["disgust", "gross", "revolting"]),
            Self::new(EmotionLabel::Surprise, &["surprise", "amazing", "wow"]),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordMatch {
    pub label: EmotionLabel,
    pub keyword: String,
}

/// Lower-cased, ordered keyword rules ready for matching.
#[derive(Clone, Debug)]
pub struct KeywordTable {
    rules: Vec<KeywordRule>,
}

impl KeywordTable {
    pub fn new(rules: &[KeywordRule]) -> Self {
        let rules = rules
            .iter()
            .map(|rule| KeywordRule {
                label: rule.label,
                keywords: rule
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    /// Returns the first rule, in table order, with a keyword contained in
    /// the lower-cased span.
    pub fn find(&self, span: &TextSpan) -> Option<KeywordMatch> {
        let lower = span.as_str().to_lowercase();
        self.rules.iter().find_map(|rule| {
            rule.keywords
                .iter()
                .find(|k| lower.contains(k.as_str()))
                .map(|k| KeywordMatch {
                    label: rule.label,
                    keyword: k.clone(),
                })
        })
    }
}
