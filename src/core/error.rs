use crate::core::config::ConfigError;
use crate::core::video::MediaError;
use thiserror::Error;

/// Errors that abort a run. Publish failures never surface here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Media error: {0}")]
    Media(#[from] MediaError),
}
