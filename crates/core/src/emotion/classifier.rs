use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

/// What an external sentiment model returns for one piece of text.
///
/// Only `confidence` feeds the engine; `label` is the model's own taxonomy
/// and is kept for logging.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RawSentiment {
    pub label: Option<String>,
    pub confidence: f32,
}

#[derive(thiserror::Error, Debug)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Network(String),

    #[error("classifier returned http {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid classifier response: {0}")]
    InvalidResponse(String),

    #[error("classifier score {0} is outside [0, 1]")]
    InvalidScore(f32),

    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}

pub trait SentimentClassifier: Send + Sync {
    fn classify_raw(&self, text: String) -> BoxFuture<'_, Result<RawSentiment, ClassifierError>>;
}

/// Answers every request with the same confidence. Used for offline runs
/// and as a deterministic stand-in for the hosted model.
#[derive(Clone, Debug)]
pub struct FixedScoreClassifier {
    confidence: f32,
}

impl FixedScoreClassifier {
    pub fn new(confidence: f32) -> Self {
        Self { confidence }
    }
}

impl Default for FixedScoreClassifier {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl SentimentClassifier for FixedScoreClassifier {
    fn classify_raw(&self, _text: String) -> BoxFuture<'_, Result<RawSentiment, ClassifierError>> {
        let confidence = self.confidence;
        async move {
            Ok(RawSentiment {
                label: None,
                confidence,
            })
        }
        .boxed()
    }
}
