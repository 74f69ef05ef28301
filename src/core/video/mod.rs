//! 帧采样：随机视频 → 随机帧 → 过滤全黑帧 → 写入固定图片路径

pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod library;
pub mod sampler;
pub mod source;

pub use error::MediaError;
pub use ffmpeg::{FfmpegBackend, FfmpegStream, ProbeInfo};
pub use frame::{format_timestamp, DecodedFrame, SelectedFrame};
pub use sampler::{FrameSampler, SamplerConfig, MIN_NON_ZERO_PIXELS};
pub use source::{MockVideoBackend, VideoBackend, VideoStream};
