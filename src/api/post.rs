//! 一次完整运行：选帧 → 生成文案 → 多平台发布

use crate::core::config::{Config, ConfigError};
use crate::core::publish::{self, PostImage, PublishFanOut, PublishReport};
use crate::core::video::{FfmpegBackend, FrameSampler, MediaError, SelectedFrame, VideoBackend};
use crate::core::Error;
use log::info;
use rand::Rng;
use std::path::Path;

/// 已选中并落盘的帧，连同要上传的图片字节
pub struct RandomFramePost {
    pub frame: SelectedFrame,
    pub image: PostImage,
}

impl RandomFramePost {
    /// Pick a frame, write it to `image_path` and read the bytes back for upload.
    pub fn create<B, R>(
        sampler: &FrameSampler<B>,
        videos_dir: &Path,
        image_path: &Path,
        rng: &mut R,
    ) -> Result<Self, Error>
    where
        B: VideoBackend,
        R: Rng + ?Sized,
    {
        let frame = sampler.sample(videos_dir, image_path, rng)?;
        let image = PostImage::load(&frame.image_path).map_err(MediaError::from)?;
        info!("🖼️ RandomFramePost: {}", frame.caption());
        Ok(Self { frame, image })
    }

    /// `"{video_name} (HH:MM:SS)"`
    pub fn alt_text(&self) -> String {
        self.frame.caption()
    }

    pub fn publish(&self, fanout: &PublishFanOut) -> PublishReport {
        fanout.publish_all(&self.image, &self.alt_text())
    }
}

/// Full run with real ffmpeg decoding and HTTP publishers.
pub fn run(config: &Config) -> Result<PublishReport, Error> {
    let client = publish::build_http_client(config.http_timeout)
        .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
    let fanout = PublishFanOut::new(publish::build_publishers(
        &config.platforms,
        &client,
        config.mastodon_poll_max_attempts,
    ));

    let backend = FfmpegBackend::new(&config.ffmpeg_path, &config.ffprobe_path);
    let sampler = FrameSampler::with_config(backend, config.sampler.clone());

    run_with(
        &sampler,
        &fanout,
        &config.videos_dir,
        &config.image_path,
        &mut rand::thread_rng(),
    )
}

/// 发布失败只记录在报告里；选帧失败则整次运行失败，不发任何请求
pub fn run_with<B, R>(
    sampler: &FrameSampler<B>,
    fanout: &PublishFanOut,
    videos_dir: &Path,
    image_path: &Path,
    rng: &mut R,
) -> Result<PublishReport, Error>
where
    B: VideoBackend,
    R: Rng + ?Sized,
{
    let post = RandomFramePost::create(sampler, videos_dir, image_path, rng)?;
    Ok(post.publish(fanout))
}
