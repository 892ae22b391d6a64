use crate::emotion::Valence;
use crate::render::{caption_lines, FrameRenderer, FrameStyle, RenderError};
use crate::timeline::TimelineEntry;
use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;

const GLYPH_TOP: i32 = 50;
const CAPTION_TOP: i32 = 130;
const BAND_HEIGHT: u32 = 8;
const LINE_SPACING: f32 = 1.4;

/// Default frame drawer: a white card with a valence-colored band, the
/// glyph near the top and the caption underneath.
///
/// Without a font only the card and band are drawn.
#[derive(Clone, Default)]
pub struct CardRenderer {
    font: Option<FontArc>,
}

impl CardRenderer {
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }

    pub fn from_font_file(path: &Path) -> Result<Self, RenderError> {
        let data = std::fs::read(path)
            .map_err(|e| RenderError::Font(format!("{}: {e}", path.display())))?;
        let font = FontArc::try_from_vec(data)
            .map_err(|e| RenderError::Font(format!("{}: {e}", path.display())))?;
        Ok(Self { font: Some(font) })
    }
}

fn band_color(valence: Valence) -> Rgba<u8> {
    match valence {
        Valence::Positive => Rgba([255, 204, 77, 255]),
        Valence::Neutral => Rgba([190, 190, 190, 255]),
        Valence::Negative => Rgba([110, 150, 215, 255]),
    }
}

fn centered_x(canvas_width: u32, text_width: u32) -> i32 {
    let offset = canvas_width.saturating_sub(text_width) / 2;
    i32::try_from(offset).unwrap_or(0)
}

impl FrameRenderer for CardRenderer {
    fn render(&self, entry: &TimelineEntry, style: &FrameStyle) -> Result<RgbaImage, RenderError> {
        if style.width == 0 || style.height == 0 {
            return Err(RenderError::InvalidSize {
                width: style.width,
                height: style.height,
            });
        }

        let mut canvas = style.placeholder();
        let band = Rect::at(0, 0).of_size(style.width, BAND_HEIGHT.min(style.height));
        draw_filled_rect_mut(&mut canvas, band, band_color(entry.label().valence()));

        let Some(font) = &self.font else {
            return Ok(canvas);
        };
        let ink = Rgba(style.foreground);

        let glyph_scale = PxScale::from(style.glyph_px);
        let glyph = entry.glyph().as_str();
        let (glyph_w, _) = text_size(glyph_scale, font, glyph);
        draw_text_mut(
            &mut canvas,
            ink,
            centered_x(style.width, glyph_w),
            GLYPH_TOP,
            glyph_scale,
            font,
            glyph,
        );

        let text_scale = PxScale::from(style.text_px);
        let line_height = (style.text_px * LINE_SPACING).ceil() as i32;
        let lines = caption_lines(
            entry.label(),
            entry.span().as_str(),
            style.max_caption_chars,
            style.wrap_columns,
        );
        let mut y = CAPTION_TOP;
        for line in &lines {
            if y >= i32::try_from(style.height).unwrap_or(i32::MAX) {
                break;
            }
            let (line_w, _) = text_size(text_scale, font, line);
            draw_text_mut(
                &mut canvas,
                ink,
                centered_x(style.width, line_w),
                y,
                text_scale,
                font,
                line,
            );
            y += line_height;
        }

        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::emotion::FixedScoreClassifier;
    use crate::timeline::TimelineBuilder;
    use std::sync::Arc;

    async fn entry(text: &str, score: f32) -> TimelineEntry {
        TimelineBuilder::new(
            &EngineConfig::default(),
            Arc::new(FixedScoreClassifier::new(score)),
        )
        .build(text)
        .await
        .unwrap()
        .into_iter()
        .next()
        .unwrap()
    }

    #[tokio::test]
    async fn fontless_card_has_nominal_size_and_band() {
        let style = FrameStyle::default();
        let image = CardRenderer::default()
            .render(&entry("so happy", 0.5).await, &style)
            .unwrap();
        assert_eq!(image.dimensions(), (style.width, style.height));
        assert_eq!(image.get_pixel(0, 0), &band_color(Valence::Positive));
        assert_eq!(
            image.get_pixel(0, style.height - 1),
            &Rgba(style.background)
        );
    }

    #[tokio::test]
    async fn band_tracks_valence() {
        let style = FrameStyle::default();
        let renderer = CardRenderer::default();
        let negative = renderer.render(&entry("plain", 0.1).await, &style).unwrap();
        let neutral = renderer.render(&entry("plain", 0.5).await, &style).unwrap();
        assert_eq!(negative.get_pixel(10, 2), &band_color(Valence::Negative));
        assert_eq!(neutral.get_pixel(10, 2), &band_color(Valence::Neutral));
    }

    #[tokio::test]
    async fn zero_sized_frame_is_an_error() {
        let style = FrameStyle {
            width: 0,
            ..FrameStyle::default()
        };
        let err = CardRenderer::default()
            .render(&entry("plain", 0.5).await, &style)
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidSize { width: 0, .. }));
    }

    #[test]
    fn missing_font_file_is_reported() {
        let err = CardRenderer::from_font_file(Path::new("/definitely/not/here.ttf"))
            .err()
            .expect("missing font");
        assert!(matches!(err, RenderError::Font(_)));
    }
}
