use crate::emotion::{ClassifierError, RawSentiment, SentimentClassifier};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Classifier double that answers per span text, optionally after a delay.
#[derive(Default)]
pub struct ScriptedClassifier {
    replies: HashMap<String, (Duration, Result<f32, String>)>,
    fallback: Option<f32>,
    pub calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(mut self, text: &str, confidence: f32) -> Self {
        self.replies
            .insert(text.to_owned(), (Duration::ZERO, Ok(confidence)));
        self
    }

    pub fn delayed(mut self, text: &str, delay_ms: u64, confidence: f32) -> Self {
        self.replies.insert(
            text.to_owned(),
            (Duration::from_millis(delay_ms), Ok(confidence)),
        );
        self
    }

    pub fn failing(mut self, text: &str, message: &str) -> Self {
        self.replies
            .insert(text.to_owned(), (Duration::ZERO, Err(message.to_owned())));
        self
    }

    pub fn otherwise(mut self, confidence: f32) -> Self {
        self.fallback = Some(confidence);
        self
    }
}

impl SentimentClassifier for ScriptedClassifier {
    fn classify_raw(&self, text: String) -> BoxFuture<'_, Result<RawSentiment, ClassifierError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.get(&text).cloned();
        let fallback = self.fallback;
        async move {
            let (delay, outcome) = match (reply, fallback) {
                (Some(reply), _) => reply,
                (None, Some(confidence)) => (Duration::ZERO, Ok(confidence)),
                (None, None) => {
                    return Err(ClassifierError::Unavailable(format!("no script for {text:?}")))
                }
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            outcome
                .map(|confidence| RawSentiment {
                    label: None,
                    confidence,
                })
                .map_err(ClassifierError::Unavailable)
        }
        .boxed()
    }
}
