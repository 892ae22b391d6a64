use crate::render::{EncodeError, Frame, MediaEncoder};
use image::codecs::gif::{GifEncoder, Repeat};
use image::Delay;

/// Default quantizer speed; 1 is slowest/best, 30 fastest.
pub const DEFAULT_GIF_SPEED: i32 = 10;

/// GIF delays are a `u16` count of 10 ms steps.
pub const GIF_DELAY_STEP_MS: u64 = 10;
pub const GIF_MAX_DELAY_MS: u64 = u16::MAX as u64 * GIF_DELAY_STEP_MS;

/// Looping animated GIF. Only durations that are a whole number of 10 ms
/// steps, up to [`GIF_MAX_DELAY_MS`], are accepted; anything else is an
/// error rather than a rounded delay.
#[derive(Clone, Debug)]
pub struct AnimatedGifEncoder {
    speed: i32,
}

impl AnimatedGifEncoder {
    pub fn new(speed: i32) -> Self {
        Self {
            speed: speed.clamp(1, 30),
        }
    }
}

impl Default for AnimatedGifEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_GIF_SPEED)
    }
}

impl MediaEncoder for AnimatedGifEncoder {
    fn media_type(&self) -> &'static str {
        "image/gif"
    }

    fn supports_duration(&self, ms: u64) -> bool {
        ms % GIF_DELAY_STEP_MS == 0 && ms <= GIF_MAX_DELAY_MS
    }

    fn encode(&self, frames: Vec<Frame>) -> Result<Vec<u8>, EncodeError> {
        if frames.is_empty() {
            return Err(EncodeError::NoFrames);
        }
        if let Some((index, ms)) = frames
            .iter()
            .map(|f| f.duration.as_millis())
            .enumerate()
            .find(|(_, ms)| !self.supports_duration(*ms))
        {
            return Err(EncodeError::UnrepresentableDelay { index, ms });
        }

        let mut out = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut out, self.speed);
            encoder.set_repeat(Repeat::Infinite)?;
            encoder.encode_frames(frames.into_iter().map(|frame| {
                // Checked above: fits in u16 steps, so in u32 ms.
                let ms = u32::try_from(frame.duration.as_millis()).unwrap_or(u32::MAX);
                image::Frame::from_parts(frame.image, 0, 0, Delay::from_numer_denom_ms(ms, 1))
            }))?;
        }
        Ok(out)
    }
}
