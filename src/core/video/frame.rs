use image::{DynamicImage, RgbImage};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// 解码后的单帧
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub image: RgbImage,
    pub index: u64,
    /// 帧在视频中的位置（毫秒）
    pub position_ms: f64,
}

impl DecodedFrame {
    pub fn new(image: RgbImage, index: u64, position_ms: f64) -> Self {
        Self {
            image,
            index,
            position_ms,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel_count(&self) -> usize {
        (self.width() * self.height()) as usize
    }

    /// 灰度图中亮度 > 0 的像素数，用来粗略判断画面是否有内容
    pub fn non_zero_pixels(&self) -> usize {
        let gray = DynamicImage::ImageRgb8(self.image.clone()).to_luma8();
        count_non_zero(gray.as_raw())
    }

    pub fn timestamp(&self) -> String {
        format_timestamp(self.position_ms)
    }
}

pub fn count_non_zero(luma: &[u8]) -> usize {
    luma.par_iter().filter(|&&v| v > 0).count()
}

/// Formats a position in milliseconds as `HH:MM:SS`. Hours wrap at 24.
pub fn format_timestamp(milliseconds: f64) -> String {
    let ms = milliseconds.max(0.0);
    let seconds = (ms / 1000.0).floor() as u64 % 60;
    let minutes = (ms / 60_000.0).floor() as u64 % 60;
    let hours = (ms / 3_600_000.0).floor() as u64 % 24;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// 视频显示名：去掉扩展名后 trim
pub fn video_display_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .unwrap_or_default()
}

pub fn caption_for(video_name: &str, timestamp: &str) -> String {
    format!("{} ({})", video_name, timestamp)
}

/// 本次运行选中的帧，已写入固定路径
#[derive(Debug, Clone)]
pub struct SelectedFrame {
    pub image_path: PathBuf,
    pub video_path: PathBuf,
    pub video_name: String,
    pub timestamp: String,
    pub frame_index: u64,
    pub position_ms: f64,
    pub non_zero_pixels: usize,
    pub attempts: u32,
}

impl SelectedFrame {
    pub fn caption(&self) -> String {
        caption_for(&self.video_name, &self.timestamp)
    }
}
