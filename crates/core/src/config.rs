use crate::duration::DurationPolicy;
use crate::emotion::{EmotionLabel, KeywordRule, ScoreBucket};
use crate::glyph::GlyphConfig;
use crate::render::FrameStyle;
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, time::Duration};

pub const DEFAULT_CLASSIFIER_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_SENTIMENT_MODEL: &str = "nlptown/bert-base-multilingual-uncased-sentiment";
pub const DEFAULT_CLASSIFIER_BASE_URL: &str = "https://api-inference.huggingface.co";
pub const ENV_HF_API_TOKEN: &str = "HF_API_TOKEN";
pub const ENV_CLASSIFIER_URL: &str = "EMOTION_CLASSIFIER_URL";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

/// Limits applied to every call into the external sentiment classifier.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClassifierSettings {
    pub timeout_ms: u64,
    pub max_concurrency: usize,
}

impl ClassifierSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_CLASSIFIER_TIMEOUT_MS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Read-only engine configuration.
///
/// Built once at startup, validated, then shared behind an `Arc` by every
/// component. Nothing mutates it afterwards.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Keyword rules in evaluation order. The first rule with a matching
    /// keyword decides the label.
    pub keywords: Vec<KeywordRule>,
    /// Score buckets, most positive first.
    pub buckets: Vec<ScoreBucket>,
    pub glyphs: GlyphConfig,
    pub duration: DurationPolicy,
    pub classifier: ClassifierSettings,
    pub frame: FrameStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            keywords: KeywordRule::default_table(),
            buckets: ScoreBucket::default_buckets(),
            glyphs: GlyphConfig::default(),
            duration: DurationPolicy::default(),
            classifier: ClassifierSettings::default(),
            frame: FrameStyle::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = Vec::with_capacity(self.keywords.len());
        for rule in &self.keywords {
            if seen.contains(&rule.label) {
                return Err(ConfigError::DuplicateKeywordLabel(rule.label));
            }
            seen.push(rule.label);
            if rule.keywords.is_empty() {
                return Err(ConfigError::EmptyKeywordList(rule.label));
            }
            if rule.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(ConfigError::BlankKeyword(rule.label));
            }
        }

        if self.buckets.is_empty() {
            return Err(ConfigError::NoBuckets);
        }
        let mut previous: Option<f32> = None;
        for bucket in &self.buckets {
            if !(0.0..=1.0).contains(&bucket.min_score) {
                return Err(ConfigError::ThresholdOutOfRange(bucket.min_score));
            }
            if let Some(prev) = previous {
                if bucket.min_score >= prev {
                    return Err(ConfigError::ThresholdsNotDescending {
                        previous: prev,
                        next: bucket.min_score,
                    });
                }
            }
            previous = Some(bucket.min_score);
        }
        if previous != Some(0.0) {
            return Err(ConfigError::BucketsDoNotCoverZero);
        }

        if self.glyphs.default.is_empty() {
            return Err(ConfigError::EmptyDefaultGlyph);
        }

        let d = &self.duration;
        if d.per_word_ms == 0 {
            return Err(ConfigError::ZeroPerWordDuration);
        }
        if d.min_ms == 0 {
            return Err(ConfigError::ZeroMinDuration);
        }
        if d.min_ms > d.max_ms {
            return Err(ConfigError::DurationBoundsInverted {
                min_ms: d.min_ms,
                max_ms: d.max_ms,
            });
        }

        if self.classifier.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.classifier.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        let f = &self.frame;
        if f.width == 0 || f.height == 0 {
            return Err(ConfigError::EmptyFrame {
                width: f.width,
                height: f.height,
            });
        }
        if f.max_caption_chars == 0 || f.wrap_columns == 0 {
            return Err(ConfigError::ZeroCaptionLimit);
        }

        Ok(())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("api key must not be empty")]
    EmptyApiKey,
    #[error("failed to read config {path}: {details}")]
    Read { path: String, details: String },
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid config json: {0}")]
    Parse(String),
    #[error("label {0} appears in more than one keyword rule")]
    DuplicateKeywordLabel(EmotionLabel),
    #[error("keyword rule for {0} has no keywords")]
    EmptyKeywordList(EmotionLabel),
    #[error("keyword rule for {0} contains a blank keyword")]
    BlankKeyword(EmotionLabel),
    #[error("at least one score bucket is required")]
    NoBuckets,
    #[error("bucket threshold {0} is outside [0, 1]")]
    ThresholdOutOfRange(f32),
    #[error("bucket thresholds must strictly descend ({previous} then {next})")]
    ThresholdsNotDescending { previous: f32, next: f32 },
    #[error("the last score bucket must start at 0.0")]
    BucketsDoNotCoverZero,
    #[error("default glyph must not be empty")]
    EmptyDefaultGlyph,
    #[error("per-word duration must be > 0 ms")]
    ZeroPerWordDuration,
    #[error("minimum duration must be > 0 ms")]
    ZeroMinDuration,
    #[error("minimum duration {min_ms} ms exceeds maximum {max_ms} ms")]
    DurationBoundsInverted { min_ms: u64, max_ms: u64 },
    #[error("classifier timeout must be > 0 ms")]
    ZeroTimeout,
    #[error("classifier concurrency must be > 0")]
    ZeroConcurrency,
    #[error("frame size {width}x{height} is empty")]
    EmptyFrame { width: u32, height: u32 },
    #[error("caption limits must be > 0")]
    ZeroCaptionLimit,
    #[error("{field} of {ms} ms cannot be shown exactly as {media_type}")]
    UnsupportedDuration {
        field: &'static str,
        ms: u64,
        media_type: &'static str,
    },
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(ApiKey::new(v)?)),
        None => match env.var(env_key) {
            Some(v) => Ok(Some(ApiKey::new(v)?)),
            None => Ok(None),
        },
    }
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().expect("defaults validate");
    }

    #[test]
    fn api_key_cli_takes_precedence_over_env() {
        let env = MapEnv::default().with_var(ENV_HF_API_TOKEN, "env-key");
        let key = resolve_api_key(Some("cli-key".to_owned()), ENV_HF_API_TOKEN, &env)
            .expect("valid key")
            .expect("present");
        assert_eq!(key.expose(), "cli-key");
    }

    #[test]
    fn api_key_env_used_when_cli_missing() {
        let env = MapEnv::default().with_var(ENV_HF_API_TOKEN, "env-key");
        let key = resolve_api_key(None, ENV_HF_API_TOKEN, &env)
            .expect("valid key")
            .expect("present");
        assert_eq!(key.expose(), "env-key");
    }

    #[test]
    fn blank_api_key_rejected() {
        let env = MapEnv::default();
        let err = resolve_api_key(Some("  ".to_owned()), ENV_HF_API_TOKEN, &env).unwrap_err();
        assert_eq!(err, ConfigError::EmptyApiKey);
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("hf_secret").unwrap();
        assert!(!format!("{key:?}").contains("hf_secret"));
    }

    #[test]
    fn resolve_string_with_default_falls_through() {
        let env = MapEnv::default().with_var(ENV_CLASSIFIER_URL, "http://env");
        assert_eq!(
            resolve_string_with_default(Some("http://cli".into()), ENV_CLASSIFIER_URL, &env, "d"),
            "http://cli"
        );
        assert_eq!(
            resolve_string_with_default(None, ENV_CLASSIFIER_URL, &env, "d"),
            "http://env"
        );
        assert_eq!(
            resolve_string_with_default(None, ENV_CLASSIFIER_URL, &MapEnv::default(), "d"),
            "d"
        );
    }

    #[test]
    fn inverted_duration_bounds_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.duration.min_ms = 6000;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::DurationBoundsInverted {
                min_ms: 6000,
                max_ms: 5000
            })
        );
    }

    #[test]
    fn buckets_must_descend_and_reach_zero() {
        let mut cfg = EngineConfig::default();
        cfg.buckets.swap(0, 1);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ThresholdsNotDescending { .. })
        ));

        let mut cfg = EngineConfig::default();
        cfg.buckets.pop();
        assert_eq!(cfg.validate(), Err(ConfigError::BucketsDoNotCoverZero));
    }

    #[test]
    fn duplicate_keyword_label_rejected() {
        let mut cfg = EngineConfig::default();
        let first = cfg.keywords[0].clone();
        cfg.keywords.push(first.clone());
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::DuplicateKeywordLabel(first.label))
        );
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg = EngineConfig::from_json(r#"{"duration": {"per_word_ms": 250}}"#)
            .expect("valid json");
        assert_eq!(cfg.duration.per_word_ms, 250);
        assert_eq!(cfg.duration.min_ms, 2000);
        assert_eq!(cfg.buckets, ScoreBucket::default_buckets());
    }

    #[test]
    fn json_keyword_table_keeps_order() {
        let cfg = EngineConfig::from_json(
            r#"{"keywords": [
                {"label": "sadness", "keywords": ["cry"]},
                {"label": "happiness", "keywords": ["smile"]}
            ]}"#,
        )
        .expect("valid json");
        let labels: Vec<_> = cfg.keywords.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec![EmotionLabel::Sadness, EmotionLabel::Happiness]);
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            EngineConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
