use crate::config::EngineConfig;
use crate::emotion::{
    ClassificationScore, ClassifierError, EmotionLabel, KeywordTable, ScoreBuckets,
    SentimentClassifier,
};
use crate::segment::TextSpan;
use crate::util::is_http_retryable;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const LOG_TARGET: &str = "emotion::analyzer";

#[derive(thiserror::Error, Debug)]
pub enum EmotionError {
    #[error("sentiment classifier unavailable: {0}")]
    ClassifierUnavailable(#[source] ClassifierError),

    #[error("sentiment classifier timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
}

impl EmotionError {
    /// Whether a caller-side retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            EmotionError::Timeout { .. } => true,
            EmotionError::ClassifierUnavailable(inner) => match inner {
                ClassifierError::Network(_) | ClassifierError::Unavailable(_) => true,
                ClassifierError::Api { status, .. } => is_http_retryable(*status),
                ClassifierError::InvalidResponse(_) | ClassifierError::InvalidScore(_) => false,
            },
        }
    }
}

/// How a label was decided.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LabelSource {
    Keyword {
        keyword: String,
    },
    Score {
        score: ClassificationScore,
        model_label: Option<String>,
    },
    /// The classifier failed and the caller opted into a substitute label.
    Degraded {
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub label: EmotionLabel,
    pub source: LabelSource,
}

/// Maps one span to one label: keyword rules first, then the bucketed
/// classifier score.
#[derive(Clone)]
pub struct EmotionAnalyzer {
    keywords: KeywordTable,
    buckets: ScoreBuckets,
    classifier: Arc<dyn SentimentClassifier>,
    timeout: Duration,
}

impl EmotionAnalyzer {
    pub fn new(config: &EngineConfig, classifier: Arc<dyn SentimentClassifier>) -> Self {
        Self {
            keywords: KeywordTable::new(&config.keywords),
            buckets: ScoreBuckets::new(&config.buckets),
            classifier,
            timeout: config.classifier.timeout(),
        }
    }

    pub async fn classify(&self, span: &TextSpan) -> Result<Classification, EmotionError> {
        if let Some(hit) = self.keywords.find(span) {
            tracing::debug!(
                target: LOG_TARGET,
                label = %hit.label,
                keyword = %hit.keyword,
                "keyword match"
            );
            return Ok(Classification {
                label: hit.label,
                source: LabelSource::Keyword {
                    keyword: hit.keyword,
                },
            });
        }

        let call = self.classifier.classify_raw(span.as_str().to_owned());
        let raw = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!(target: LOG_TARGET, error = %e, "classifier call failed");
                return Err(EmotionError::ClassifierUnavailable(e));
            }
            Err(_) => {
                let after_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(target: LOG_TARGET, after_ms, "classifier call timed out");
                return Err(EmotionError::Timeout { after_ms });
            }
        };

        let score =
            ClassificationScore::new(raw.confidence).map_err(EmotionError::ClassifierUnavailable)?;
        let label = self.buckets.bucket(score);
        tracing::debug!(
            target: LOG_TARGET,
            label = %label,
            score = score.value(),
            "bucketed classifier score"
        );
        Ok(Classification {
            label,
            source: LabelSource::Score {
                score,
                model_label: raw.label,
            },
        })
    }
}
