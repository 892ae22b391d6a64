mod caption;
mod card;
mod gif;

use crate::duration::DisplayDuration;
use crate::timeline::{Timeline, TimelineEntry};
use bytes::Bytes;
use futures::StreamExt;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use caption::{caption_lines, truncate_chars, wrap};
pub use card::CardRenderer;
pub use gif::AnimatedGifEncoder;

const LOG_TARGET: &str = "render";

pub const DEFAULT_FRAME_WIDTH: u32 = 500;
pub const DEFAULT_FRAME_HEIGHT: u32 = 300;
pub const DEFAULT_WRAP_COLUMNS: usize = 40;
pub const DEFAULT_MAX_CAPTION_CHARS: usize = 120;

/// Frame geometry and colors, shared by every frame of one artifact.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FrameStyle {
    pub width: u32,
    pub height: u32,
    pub background: [u8; 4],
    pub foreground: [u8; 4],
    pub glyph_px: f32,
    pub text_px: f32,
    pub wrap_columns: usize,
    pub max_caption_chars: usize,
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self {
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
            background: [255, 255, 255, 255],
            foreground: [0, 0, 0, 255],
            glyph_px: 60.0,
            text_px: 20.0,
            wrap_columns: DEFAULT_WRAP_COLUMNS,
            max_caption_chars: DEFAULT_MAX_CAPTION_CHARS,
        }
    }
}

impl FrameStyle {
    /// A blank frame of the nominal size.
    pub fn placeholder(&self) -> RgbaImage {
        RgbaImage::from_pixel(self.width, self.height, Rgba(self.background))
    }
}

#[derive(Clone, Debug)]
pub struct Frame {
    pub image: RgbaImage,
    pub duration: DisplayDuration,
    /// Set when rendering failed and a blank frame stands in.
    pub placeholder: bool,
}

/// Encoded output plus what went into it.
#[derive(Clone, Debug, PartialEq)]
pub struct Artifact {
    pub bytes: Bytes,
    pub media_type: &'static str,
    pub frame_count: usize,
    pub durations_ms: Vec<u64>,
    pub placeholders: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RenderOutcome {
    /// The timeline had no entries, so there is no artifact.
    NothingToShow,
    Rendered(Artifact),
}

impl RenderOutcome {
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            RenderOutcome::NothingToShow => None,
            RenderOutcome::Rendered(artifact) => Some(artifact),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("frame size {width}x{height} is empty")]
    InvalidSize { width: u32, height: u32 },

    #[error("failed to load font: {0}")]
    Font(String),

    #[error("frame drawing failed: {0}")]
    Drawing(String),
}

#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error("nothing to encode")]
    NoFrames,

    #[error("frame {index} lasts {ms} ms, which the format cannot store exactly")]
    UnrepresentableDelay { index: usize, ms: u64 },

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("encoder task failed: {0}")]
    Task(String),
}

#[derive(thiserror::Error, Debug)]
pub enum AssembleError {
    #[error("encoding failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("render cancelled")]
    Cancelled,
}

/// Draws one timeline entry.
pub trait FrameRenderer: Send + Sync {
    fn render(&self, entry: &TimelineEntry, style: &FrameStyle) -> Result<RgbaImage, RenderError>;
}

/// Turns ordered frames into one animated artifact. Frame `i` must be shown
/// for exactly `frames[i].duration`.
pub trait MediaEncoder: Send + Sync {
    fn media_type(&self) -> &'static str;

    /// Whether a frame of `ms` milliseconds can be stored without changing
    /// its display time.
    fn supports_duration(&self, _ms: u64) -> bool {
        true
    }

    fn encode(&self, frames: Vec<Frame>) -> Result<Vec<u8>, EncodeError>;
}

pub struct FrameAssembler {
    renderer: Arc<dyn FrameRenderer>,
    encoder: Arc<dyn MediaEncoder>,
    style: FrameStyle,
    max_concurrency: usize,
}

impl FrameAssembler {
    pub fn new(
        renderer: Arc<dyn FrameRenderer>,
        encoder: Arc<dyn MediaEncoder>,
        style: FrameStyle,
        max_concurrency: usize,
    ) -> Self {
        Self {
            renderer,
            encoder,
            style,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Renders every entry on the blocking pool. A frame that fails to
    /// render is replaced by a blank placeholder; order and count always
    /// match the timeline.
    pub async fn frames(&self, timeline: &Timeline) -> Vec<Frame> {
        futures::stream::iter(timeline.iter().cloned().enumerate())
            .map(|(index, entry)| self.render_frame(index, entry))
            .buffered(self.max_concurrency)
            .collect()
            .await
    }

    async fn render_frame(&self, index: usize, entry: TimelineEntry) -> Frame {
        let duration = entry.duration();
        let renderer = Arc::clone(&self.renderer);
        let style = self.style;
        let rendered =
            tokio::task::spawn_blocking(move || renderer.render(&entry, &style)).await;

        match rendered {
            Ok(Ok(image)) => Frame {
                image,
                duration,
                placeholder: false,
            },
            Ok(Err(e)) => {
                tracing::warn!(target: LOG_TARGET, index, error = %e, "frame render failed, using placeholder");
                self.placeholder(duration)
            }
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, index, error = %e, "frame render task died, using placeholder");
                self.placeholder(duration)
            }
        }
    }

    fn placeholder(&self, duration: DisplayDuration) -> Frame {
        Frame {
            image: self.style.placeholder(),
            duration,
            placeholder: true,
        }
    }

    pub async fn render(&self, timeline: &Timeline) -> Result<RenderOutcome, AssembleError> {
        if timeline.is_empty() {
            tracing::debug!(target: LOG_TARGET, "empty timeline, nothing to render");
            return Ok(RenderOutcome::NothingToShow);
        }

        let frames = self.frames(timeline).await;
        let frame_count = frames.len();
        let durations_ms: Vec<u64> = frames.iter().map(|f| f.duration.as_millis()).collect();
        let placeholders = frames.iter().filter(|f| f.placeholder).count();

        let encoder = Arc::clone(&self.encoder);
        let bytes = tokio::task::spawn_blocking(move || encoder.encode(frames))
            .await
            .map_err(|e| EncodeError::Task(e.to_string()))??;

        tracing::info!(
            target: LOG_TARGET,
            frames = frame_count,
            placeholders,
            bytes = bytes.len(),
            "artifact encoded"
        );
        Ok(RenderOutcome::Rendered(Artifact {
            bytes: Bytes::from(bytes),
            media_type: self.encoder.media_type(),
            frame_count,
            durations_ms,
            placeholders,
        }))
    }

    pub async fn render_with_cancel(
        &self,
        timeline: &Timeline,
        cancel: &CancellationToken,
    ) -> Result<RenderOutcome, AssembleError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(target: LOG_TARGET, "render cancelled");
                Err(AssembleError::Cancelled)
            }
            result = self.render(timeline) => result,
        }
    }
}
