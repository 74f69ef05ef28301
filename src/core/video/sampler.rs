use super::error::MediaError;
use super::frame::{video_display_name, SelectedFrame};
use super::library;
use super::source::{VideoBackend, VideoStream};
use crate::core::error::Error;
use image::ImageFormat;
use log::{debug, info};
use rand::Rng;
use std::path::Path;

/// 灰度非零像素数必须超过该值，才算“有画面”
pub const MIN_NON_ZERO_PIXELS: usize = 2500;

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub min_non_zero_pixels: usize,
    /// `None` keeps resampling forever; an all-black video then never returns.
    pub max_attempts: Option<u32>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            min_non_zero_pixels: MIN_NON_ZERO_PIXELS,
            max_attempts: Some(1000),
        }
    }
}

impl SamplerConfig {
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            ..Self::default()
        }
    }
}

pub struct FrameSampler<B: VideoBackend> {
    backend: B,
    config: SamplerConfig,
}

impl<B: VideoBackend> FrameSampler<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, SamplerConfig::default())
    }

    pub fn with_config(backend: B, config: SamplerConfig) -> Self {
        Self { backend, config }
    }

    /// 随机选视频 → 随机选帧 → 写入 `output`
    pub fn sample<R: Rng + ?Sized>(
        &self,
        videos_dir: &Path,
        output: &Path,
        rng: &mut R,
    ) -> Result<SelectedFrame, Error> {
        let video = library::pick_video(videos_dir, rng)?;
        info!("🎲 Picked video: {}", video.display());
        Ok(self.sample_video(&video, output, rng)?)
    }

    /// Draws frame indices from `[1, frame_count]` until one passes the
    /// brightness check.
    ///
    /// The upper bound is inclusive while decoders index from 0, so drawing
    /// `frame_count` reads past the last frame and fails with
    /// [`MediaError::FrameUnavailable`].
    pub fn sample_video<R: Rng + ?Sized>(
        &self,
        video: &Path,
        output: &Path,
        rng: &mut R,
    ) -> Result<SelectedFrame, MediaError> {
        let mut stream = self.backend.open(video)?;
        let total_frames = stream.frame_count();
        if total_frames == 0 {
            return Err(MediaError::UnknownFrameCount(video.display().to_string()));
        }

        let mut attempts = 0u32;
        loop {
            if let Some(max) = self.config.max_attempts {
                if attempts >= max {
                    return Err(MediaError::NoAcceptableFrame { attempts });
                }
            }
            attempts += 1;

            let index = rng.gen_range(1..=total_frames);
            let frame = stream
                .read_frame(index)?
                .ok_or(MediaError::FrameUnavailable { index })?;

            let non_zero = frame.non_zero_pixels();
            if non_zero <= self.config.min_non_zero_pixels {
                debug!(
                    "Frame {} rejected: {} non-zero pixels (attempt {})",
                    index, non_zero, attempts
                );
                continue;
            }

            frame.image.save_with_format(output, ImageFormat::Jpeg)?;

            let selected = SelectedFrame {
                image_path: output.to_path_buf(),
                video_path: video.to_path_buf(),
                video_name: video_display_name(video),
                timestamp: frame.timestamp(),
                frame_index: index,
                position_ms: frame.position_ms,
                non_zero_pixels: non_zero,
                attempts,
            };
            info!(
                "✅ Frame {} accepted after {} attempt(s): {} non-zero pixels, saved to {}",
                index,
                attempts,
                non_zero,
                output.display()
            );
            return Ok(selected);
        }
    }
}
