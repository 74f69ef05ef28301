use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ffprobe failed: {0}")]
    Probe(String),
    #[error("ffmpeg failed: {0}")]
    Decode(String),
    #[error("No video stream in {0}")]
    NoVideoStream(String),
    #[error("Could not determine frame count of {0}")]
    UnknownFrameCount(String),
    #[error("Frame {index} could not be read (past end of stream?)")]
    FrameUnavailable { index: u64 },
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("No frame above the brightness threshold after {attempts} attempts")]
    NoAcceptableFrame { attempts: u32 },
}
