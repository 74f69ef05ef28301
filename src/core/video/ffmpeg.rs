//! ffprobe / ffmpeg 命令行解码后端

use super::error::MediaError;
use super::frame::DecodedFrame;
use super::source::{VideoBackend, VideoStream};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeInfo {
    pub frame_count: u64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub duration_ms: f64,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<Value>,
    format: Option<Value>,
}

pub struct FfmpegBackend {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegBackend {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    fn probe(&self, path: &Path) -> Result<ProbeInfo, MediaError> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "quiet",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=r_frame_rate,avg_frame_rate,nb_frames,duration,width,height",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| MediaError::Probe(format!("ffprobe execution failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::Probe(format!(
                "ffprobe exited with {}: {}",
                output.status, stderr
            )));
        }

        parse_probe_json(&String::from_utf8_lossy(&output.stdout), path)
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl VideoBackend for FfmpegBackend {
    type Stream = FfmpegStream;

    fn open(&self, path: &Path) -> Result<FfmpegStream, MediaError> {
        let info = self.probe(path)?;
        info!(
            "🎬 Opened {}: {} frames @ {:.3} fps, {}x{}",
            path.display(),
            info.frame_count,
            info.fps,
            info.width,
            info.height
        );
        Ok(FfmpegStream {
            path: path.to_path_buf(),
            ffmpeg: self.ffmpeg.clone(),
            info,
        })
    }
}

pub struct FfmpegStream {
    path: PathBuf,
    ffmpeg: PathBuf,
    info: ProbeInfo,
}

impl VideoStream for FfmpegStream {
    fn frame_count(&self) -> u64 {
        self.info.frame_count
    }

    fn read_frame(&mut self, index: u64) -> Result<Option<DecodedFrame>, MediaError> {
        let position_ms = index as f64 * 1000.0 / self.info.fps;
        let seek = format!("{:.3}", position_ms / 1000.0);
        debug!("Decoding frame {} at {}s", index, seek);

        let output = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-ss", &seek, "-i"])
            .arg(&self.path)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"])
            .output()
            .map_err(|e| MediaError::Decode(format!("ffmpeg execution failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::Decode(format!(
                "ffmpeg exited with {}: {}",
                output.status, stderr
            )));
        }

        if output.stdout.is_empty() {
            warn!("⚠️ ffmpeg produced no frame for index {}", index);
            return Ok(None);
        }

        let image = image::load_from_memory(&output.stdout)?.to_rgb8();
        Ok(Some(DecodedFrame::new(image, index, position_ms)))
    }
}

impl Drop for FfmpegStream {
    fn drop(&mut self) {
        info!("🗑️ FfmpegStream: released {}", self.path.display());
    }
}

/// Parses `ffprobe -of json` output for the first video stream.
pub fn parse_probe_json(json: &str, path: &Path) -> Result<ProbeInfo, MediaError> {
    let probe: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| MediaError::Probe(format!("Failed to parse ffprobe JSON: {}", e)))?;

    let stream = probe
        .streams
        .first()
        .ok_or_else(|| MediaError::NoVideoStream(path.display().to_string()))?;

    let fps = ["r_frame_rate", "avg_frame_rate"]
        .iter()
        .filter_map(|key| stream.get(*key).and_then(|v| v.as_str()))
        .filter_map(parse_fps_fraction)
        .next()
        .unwrap_or(0.0);

    let width = stream.get("width").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    let height = stream.get("height").and_then(|v| v.as_u64()).unwrap_or(0) as u32;

    // MKV 往往只有 format 级别的 duration
    let duration_secs = parse_numeric(stream.get("duration"))
        .or_else(|| parse_numeric(probe.format.as_ref().and_then(|f| f.get("duration"))))
        .unwrap_or(0.0);
    let duration_ms = duration_secs * 1000.0;

    let mut frame_count = stream
        .get("nb_frames")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    if frame_count == 0 && duration_ms > 0.0 && fps > 0.0 {
        frame_count = (duration_ms * fps / 1000.0) as u64;
    }

    if frame_count == 0 || fps <= 0.0 {
        return Err(MediaError::UnknownFrameCount(path.display().to_string()));
    }

    Ok(ProbeInfo {
        frame_count,
        fps,
        width,
        height,
        duration_ms,
    })
}

fn parse_numeric(value: Option<&Value>) -> Option<f64> {
    value
        .and_then(|v| v.as_str())
        .filter(|s| *s != "N/A")
        .and_then(|s| s.parse::<f64>().ok())
}

/// "30000/1001" -> 29.97
pub fn parse_fps_fraction(fraction: &str) -> Option<f64> {
    let (num, den) = fraction.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}
