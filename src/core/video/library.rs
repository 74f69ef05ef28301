//! 视频目录：每次运行重新枚举

use crate::core::config::ConfigError;
use log::debug;
use rand::Rng;
use std::path::{Path, PathBuf};

/// Lists regular files in `dir`, sorted by name.
pub fn list_videos(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    if !dir.is_dir() {
        return Err(ConfigError::VideoDirMissing(dir.to_path_buf()));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::Invalid {
        var: "VIDEOS_DIR".to_string(),
        reason: format!("{}: {}", dir.display(), e),
    })?;

    let mut videos: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    videos.sort();

    debug!("Found {} files in {}", videos.len(), dir.display());
    Ok(videos)
}

/// 均匀随机选一个视频
pub fn pick_video<R: Rng + ?Sized>(dir: &Path, rng: &mut R) -> Result<PathBuf, ConfigError> {
    let videos = list_videos(dir)?;
    if videos.is_empty() {
        return Err(ConfigError::VideoDirEmpty(dir.to_path_buf()));
    }
    let index = rng.gen_range(0..videos.len());
    Ok(videos[index].clone())
}
