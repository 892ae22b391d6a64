use crate::config::EngineConfig;
use crate::duration::{DisplayDuration, DurationPolicy};
use crate::emotion::{
    Classification, EmotionAnalyzer, EmotionError, EmotionLabel, LabelSource, SentimentClassifier,
};
use crate::glyph::{Glyph, GlyphResolver};
use crate::segment::{segment, TextSpan};
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "timeline";

/// One classified, timed span. Fields are read-only once built.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TimelineEntry {
    span: TextSpan,
    label: EmotionLabel,
    glyph: Glyph,
    duration: DisplayDuration,
    source: LabelSource,
}

impl TimelineEntry {
    pub fn span(&self) -> &TextSpan {
        &self.span
    }

    pub fn label(&self) -> EmotionLabel {
        self.label
    }

    pub fn glyph(&self) -> &Glyph {
        &self.glyph
    }

    pub fn duration(&self) -> DisplayDuration {
        self.duration
    }

    pub fn source(&self) -> &LabelSource {
        &self.source
    }
}

/// Ordered entries for one input text.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimelineEntry> {
        self.entries.iter()
    }

    pub fn total_duration(&self) -> Duration {
        self.entries.iter().map(|e| e.duration.as_duration()).sum()
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a TimelineEntry;
    type IntoIter = std::slice::Iter<'a, TimelineEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Timeline {
    type Item = TimelineEntry;
    type IntoIter = std::vec::IntoIter<TimelineEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TimelineError {
    #[error("classification failed for span {index} ({span:?}): {source}")]
    Classification {
        index: usize,
        span: String,
        #[source]
        source: EmotionError,
    },

    #[error("timeline build cancelled")]
    Cancelled,
}

impl TimelineError {
    pub fn is_retryable(&self) -> bool {
        match self {
            TimelineError::Classification { source, .. } => source.is_retryable(),
            TimelineError::Cancelled => false,
        }
    }
}

/// What to do when the external classifier fails for a span.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClassifierFailurePolicy {
    /// Abort the build and report the failure.
    #[default]
    Fail,
    /// Use the given label and record the failure on the entry.
    Substitute(EmotionLabel),
}

pub struct TimelineBuilder {
    analyzer: EmotionAnalyzer,
    glyphs: GlyphResolver,
    durations: DurationPolicy,
    max_concurrency: usize,
    failure_policy: ClassifierFailurePolicy,
}

impl TimelineBuilder {
    pub fn new(config: &EngineConfig, classifier: Arc<dyn SentimentClassifier>) -> Self {
        Self {
            analyzer: EmotionAnalyzer::new(config, classifier),
            glyphs: GlyphResolver::new(&config.glyphs),
            durations: config.duration,
            max_concurrency: config.classifier.max_concurrency.max(1),
            failure_policy: ClassifierFailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: ClassifierFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Segments `text` and classifies every span, at most
    /// `max_concurrency` at a time. Entries come back in span order.
    pub async fn build(&self, text: &str) -> Result<Timeline, TimelineError> {
        let spans = segment(text);
        if spans.is_empty() {
            tracing::debug!(target: LOG_TARGET, "no spans in input");
            return Ok(Timeline::default());
        }

        let span_count = spans.len();
        let entries: Vec<TimelineEntry> = futures::stream::iter(spans.into_iter().enumerate())
            .map(|(index, span)| self.build_entry(index, span))
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        debug_assert_eq!(entries.len(), span_count);
        let timeline = Timeline { entries };
        tracing::info!(
            target: LOG_TARGET,
            entries = timeline.len(),
            total_ms = u64::try_from(timeline.total_duration().as_millis()).unwrap_or(u64::MAX),
            "timeline built"
        );
        Ok(timeline)
    }

    /// Like [`build`](Self::build), but gives up as soon as `cancel` fires.
    /// A cancelled build returns no entries at all.
    pub async fn build_with_cancel(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Timeline, TimelineError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(target: LOG_TARGET, "timeline build cancelled");
                Err(TimelineError::Cancelled)
            }
            result = self.build(text) => result,
        }
    }

    async fn build_entry(
        &self,
        index: usize,
        span: TextSpan,
    ) -> Result<TimelineEntry, TimelineError> {
        let Classification { label, source } = match self.analyzer.classify(&span).await {
            Ok(classification) => classification,
            Err(e) => match self.failure_policy {
                ClassifierFailurePolicy::Fail => {
                    return Err(TimelineError::Classification {
                        index,
                        span: span.as_str().to_owned(),
                        source: e,
                    })
                }
                ClassifierFailurePolicy::Substitute(label) => {
                    tracing::warn!(
                        target: LOG_TARGET,
                        index,
                        substitute = %label,
                        error = %e,
                        "classifier failed, using substitute label"
                    );
                    Classification {
                        label,
                        source: LabelSource::Degraded {
                            reason: e.to_string(),
                        },
                    }
                }
            },
        };

        Ok(TimelineEntry {
            glyph: self.glyphs.resolve(label),
            duration: self.durations.duration(&span),
            span,
            label,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::FixedScoreClassifier;
    use crate::glyph::builtin_glyph;
    use crate::test_support::ScriptedClassifier;
    use std::sync::atomic::Ordering;

    fn builder(classifier: impl SentimentClassifier + 'static) -> TimelineBuilder {
        TimelineBuilder::new(&EngineConfig::default(), Arc::new(classifier))
    }

    fn labels(timeline: &Timeline) -> Vec<EmotionLabel> {
        timeline.iter().map(TimelineEntry::label).collect()
    }

    #[tokio::test]
    async fn keyword_hit_then_score_fallback() {
        let classifier = ScriptedClassifier::new().score("This is terrible", 0.1);
        let timeline = builder(classifier)
            .build("I am so happy today. This is terrible.")
            .await
            .unwrap();

        assert_eq!(timeline.len(), 2);
        let first = &timeline.entries()[0];
        assert_eq!(first.label(), EmotionLabel::Happiness);
        assert_eq!(first.glyph().as_str(), builtin_glyph(EmotionLabel::Happiness));
        assert_eq!(first.span().as_str(), "I am so happy today");
        assert!(matches!(first.source(), LabelSource::Keyword { .. }));

        let second = &timeline.entries()[1];
        assert_eq!(second.label(), EmotionLabel::VeryNegative);
        assert!(matches!(second.source(), LabelSource::Score { .. }));
    }

    #[tokio::test]
    async fn empty_input_is_an_empty_timeline() {
        let classifier = ScriptedClassifier::new();
        let b = builder(classifier);
        assert!(b.build("").await.unwrap().is_empty());
        assert!(b.build("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn entry_count_matches_non_blank_segments() {
        let text = "One. . Two!   ? Three four five";
        let timeline = builder(FixedScoreClassifier::new(0.5))
            .build(text)
            .await
            .unwrap();
        assert_eq!(timeline.len(), segment(text).len());
        assert_eq!(timeline.len(), 3);
    }

    #[tokio::test]
    async fn durations_stay_in_bounds() {
        let text = "Hi. This sentence has exactly twelve words in it so it clamps down. Six words are right here now.";
        let timeline = builder(FixedScoreClassifier::new(0.5))
            .build(text)
            .await
            .unwrap();
        let ms: Vec<u64> = timeline.iter().map(|e| e.duration().as_millis()).collect();
        assert_eq!(ms, vec![2000, 5000, 3000]);
    }

    #[tokio::test]
    async fn order_survives_out_of_order_completion() {
        let classifier = ScriptedClassifier::new()
            .delayed("first", 60, 0.9)
            .delayed("second", 30, 0.5)
            .delayed("third", 0, 0.1);
        let timeline = builder(classifier)
            .build("first. second. third.")
            .await
            .unwrap();
        let spans: Vec<&str> = timeline.iter().map(|e| e.span().as_str()).collect();
        assert_eq!(spans, vec!["first", "second", "third"]);
        assert_eq!(
            labels(&timeline),
            vec![
                EmotionLabel::VeryPositive,
                EmotionLabel::Neutral,
                EmotionLabel::VeryNegative
            ]
        );
    }

    #[tokio::test]
    async fn identical_input_gives_identical_timeline() {
        let b = builder(ScriptedClassifier::new().otherwise(0.65));
        let text = "What a day. I feel glad. Nothing else.";
        let a = b.build(text).await.unwrap();
        let c = b.build(text).await.unwrap();
        assert_eq!(a, c);
    }

    #[tokio::test]
    async fn classifier_failure_aborts_with_span_index() {
        let classifier = ScriptedClassifier::new()
            .score("fine", 0.5)
            .failing("broken", "model offline");
        let err = builder(classifier)
            .build("fine. broken.")
            .await
            .unwrap_err();
        match err {
            TimelineError::Classification { index, span, .. } => {
                assert_eq!(index, 1);
                assert_eq!(span, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn substitute_policy_degrades_explicitly() {
        let classifier = ScriptedClassifier::new().failing("broken", "model offline");
        let timeline = builder(classifier)
            .with_failure_policy(ClassifierFailurePolicy::Substitute(EmotionLabel::Neutral))
            .build("broken. so happy.")
            .await
            .unwrap();
        assert_eq!(
            labels(&timeline),
            vec![EmotionLabel::Neutral, EmotionLabel::Happiness]
        );
        assert!(matches!(
            timeline.entries()[0].source(),
            LabelSource::Degraded { reason } if reason.contains("model offline")
        ));
    }

    #[tokio::test]
    async fn cancelled_build_returns_nothing() {
        let classifier = ScriptedClassifier::new().delayed("slow", 5_000, 0.5);
        let b = builder(classifier);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let _ = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let err = b.build_with_cancel("slow.", &cancel).await.unwrap_err();
        assert!(matches!(err, TimelineError::Cancelled));
    }

    #[tokio::test]
    async fn keyword_spans_never_reach_classifier() {
        let classifier = Arc::new(ScriptedClassifier::new().otherwise(0.5));
        let b = TimelineBuilder::new(&EngineConfig::default(), classifier.clone());
        b.build("so happy. wow. plain.").await.unwrap();
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }
}
