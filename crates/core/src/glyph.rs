use crate::emotion::EmotionLabel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_GLYPH: &str = "\u{2753}";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Glyph(String);

impl Glyph {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Emoji shipped for each label.
pub fn builtin_glyph(label: EmotionLabel) -> &'static str {
    match label {
        EmotionLabel::Happiness => "\u{1F604}",
        EmotionLabel::Sadness => "\u{1F61E}",
        EmotionLabel::Anger => "\u{1F620}",
        EmotionLabel::Fear => "\u{1F628}",
        EmotionLabel::Disgust => "\u{1F922}",
        EmotionLabel::Surprise => "\u{1F632}",
        EmotionLabel::VeryPositive => "\u{1F917}",
        EmotionLabel::Positive => "\u{1F60A}",
        EmotionLabel::Neutral => "\u{1F610}",
        EmotionLabel::Negative => "\u{1F614}",
        EmotionLabel::VeryNegative => "\u{1F622}",
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GlyphConfig {
    pub table: BTreeMap<EmotionLabel, String>,
    /// Used for any label missing from `table`.
    pub default: String,
}

impl Default for GlyphConfig {
    fn default() -> Self {
        Self {
            table: EmotionLabel::ALL
                .into_iter()
                .map(|label| (label, builtin_glyph(label).to_owned()))
                .collect(),
            default: DEFAULT_GLYPH.to_owned(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GlyphResolver {
    table: BTreeMap<EmotionLabel, Glyph>,
    default: Glyph,
}

impl GlyphResolver {
    pub fn new(config: &GlyphConfig) -> Self {
        Self {
            table: config
                .table
                .iter()
                .filter(|(_, glyph)| !glyph.is_empty())
                .map(|(label, glyph)| (*label, Glyph(glyph.clone())))
                .collect(),
            default: Glyph(config.default.clone()),
        }
    }

    pub fn resolve(&self, label: EmotionLabel) -> Glyph {
        self.table
            .get(&label)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}
