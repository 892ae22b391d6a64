use crate::config::{ConfigError, EngineConfig};
use crate::emotion::SentimentClassifier;
use crate::render::{
    AnimatedGifEncoder, AssembleError, CardRenderer, FrameAssembler, FrameRenderer, MediaEncoder,
    RenderOutcome,
};
use crate::timeline::{ClassifierFailurePolicy, Timeline, TimelineBuilder, TimelineError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            PipelineError::Timeline(TimelineError::Cancelled)
                | PipelineError::Assemble(AssembleError::Cancelled)
        )
    }
}

/// Text in, timeline and animation out.
///
/// Holds the validated configuration and the external collaborators; every
/// call builds a fresh timeline and keeps nothing between calls.
pub struct Engine {
    config: Arc<EngineConfig>,
    timeline: TimelineBuilder,
    assembler: FrameAssembler,
}

/// Every duration the policy can produce is `min_ms`, `max_ms` or a
/// multiple of `per_word_ms` between them, so checking those three is
/// enough for an encoder whose timing grid is a fixed step.
fn check_durations(
    config: &EngineConfig,
    encoder: &dyn MediaEncoder,
) -> Result<(), ConfigError> {
    let d = &config.duration;
    for (field, ms) in [
        ("per_word_ms", d.per_word_ms),
        ("min_ms", d.min_ms),
        ("max_ms", d.max_ms),
    ] {
        if !encoder.supports_duration(ms) {
            return Err(ConfigError::UnsupportedDuration {
                field,
                ms,
                media_type: encoder.media_type(),
            });
        }
    }
    Ok(())
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        classifier: Arc<dyn SentimentClassifier>,
        renderer: Arc<dyn FrameRenderer>,
        encoder: Arc<dyn MediaEncoder>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        check_durations(&config, encoder.as_ref())?;
        let config = Arc::new(config);
        let timeline = TimelineBuilder::new(&config, classifier);
        let assembler = FrameAssembler::new(
            renderer,
            encoder,
            config.frame,
            config.classifier.max_concurrency,
        );
        Ok(Self {
            config,
            timeline,
            assembler,
        })
    }

    /// Card frames without a font, encoded as GIF.
    pub fn with_defaults(
        config: EngineConfig,
        classifier: Arc<dyn SentimentClassifier>,
    ) -> Result<Self, ConfigError> {
        Self::new(
            config,
            classifier,
            Arc::new(CardRenderer::default()),
            Arc::new(AnimatedGifEncoder::default()),
        )
    }

    pub fn with_failure_policy(mut self, policy: ClassifierFailurePolicy) -> Self {
        self.timeline = self.timeline.with_failure_policy(policy);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn analyze(&self, text: &str) -> Result<Timeline, TimelineError> {
        self.timeline.build(text).await
    }

    pub async fn analyze_with_cancel(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Timeline, TimelineError> {
        self.timeline.build_with_cancel(text, cancel).await
    }

    pub async fn render(&self, timeline: &Timeline) -> Result<RenderOutcome, AssembleError> {
        self.assembler.render(timeline).await
    }

    pub async fn render_with_cancel(
        &self,
        timeline: &Timeline,
        cancel: &CancellationToken,
    ) -> Result<RenderOutcome, AssembleError> {
        self.assembler.render_with_cancel(timeline, cancel).await
    }

    /// Analyze and render as one cancellable unit.
    pub async fn run(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<(Timeline, RenderOutcome), PipelineError> {
        let timeline = self.analyze_with_cancel(text, cancel).await?;
        let outcome = self.render_with_cancel(&timeline, cancel).await?;
        Ok((timeline, outcome))
    }
}
