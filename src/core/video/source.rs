use super::error::MediaError;
use super::frame::DecodedFrame;
use image::RgbImage;
use std::path::Path;
use std::sync::Arc;

/// 打开视频文件，得到可随机读帧的流
pub trait VideoBackend {
    type Stream: VideoStream;

    fn open(&self, path: &Path) -> Result<Self::Stream, MediaError>;
}

/// An opened video. Dropping it releases the decoder.
pub trait VideoStream {
    /// Total frame count as reported by the container.
    fn frame_count(&self) -> u64;

    /// Seek to `index` (0-based) and decode that frame.
    /// `Ok(None)` means the decoder produced nothing, e.g. past the last frame.
    fn read_frame(&mut self, index: u64) -> Result<Option<DecodedFrame>, MediaError>;
}

type FramePattern = Arc<dyn Fn(u64) -> RgbImage + Send + Sync>;

/// 测试用后端：按帧号生成合成画面
pub struct MockVideoBackend {
    frame_count: u64,
    fps: f64,
    pattern: FramePattern,
}

impl MockVideoBackend {
    pub fn with_pattern<F>(frame_count: u64, fps: f64, pattern: F) -> Self
    where
        F: Fn(u64) -> RgbImage + Send + Sync + 'static,
    {
        Self {
            frame_count,
            fps,
            pattern: Arc::new(pattern),
        }
    }

    pub fn uniform(frame_count: u64, fps: f64, width: u32, height: u32, value: u8) -> Self {
        Self::with_pattern(frame_count, fps, move |_| {
            RgbImage::from_pixel(width, height, image::Rgb([value, value, value]))
        })
    }
}

impl VideoBackend for MockVideoBackend {
    type Stream = MockVideoStream;

    fn open(&self, path: &Path) -> Result<Self::Stream, MediaError> {
        if !path.is_file() {
            return Err(MediaError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )));
        }
        Ok(MockVideoStream {
            frame_count: self.frame_count,
            fps: self.fps,
            pattern: Arc::clone(&self.pattern),
        })
    }
}

pub struct MockVideoStream {
    frame_count: u64,
    fps: f64,
    pattern: FramePattern,
}

impl VideoStream for MockVideoStream {
    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn read_frame(&mut self, index: u64) -> Result<Option<DecodedFrame>, MediaError> {
        // 与真实解码器一致：帧号从 0 开始，index == frame_count 已越界
        if index >= self.frame_count {
            return Ok(None);
        }
        let position_ms = index as f64 * 1000.0 / self.fps;
        Ok(Some(DecodedFrame::new(
            (self.pattern)(index),
            index,
            position_ms,
        )))
    }
}
