//! 进程配置：全部来自环境变量，启动时加载一次
//!
//! 每个平台的凭据独立校验。缺字段只会让该平台失败，不影响其他平台。

use crate::core::video::SamplerConfig;
use log::warn;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_IMAGE_PATH: &str = "image.jpg";
pub const DEFAULT_LOG_FILE: &str = "randochrontendo.log";
pub const DEFAULT_BSKY_PDS_URL: &str = "https://bsky.social";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MASTODON_POLL_MAX_ATTEMPTS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {var}")]
    Missing { var: String },
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
    #[error("Video directory not found: {0}")]
    VideoDirMissing(PathBuf),
    #[error("Video directory contains no files: {0}")]
    VideoDirEmpty(PathBuf),
    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),
}

/// A platform's credential bundle, or the reason it could not be loaded.
pub type Credentials<T> = Result<T, ConfigError>;

#[derive(Clone)]
pub struct TwitterCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

#[derive(Clone)]
pub struct CohostCredentials {
    pub email: String,
    pub password: String,
    pub project: String,
}

#[derive(Clone)]
pub struct TumblrCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub oauth_token: String,
    pub oauth_secret: String,
    pub blog: String,
}

#[derive(Clone)]
pub struct MastodonCredentials {
    pub access_token: String,
    pub api_base_url: String,
}

#[derive(Clone)]
pub struct BlueskyCredentials {
    pub handle: String,
    pub password: String,
    pub pds_url: String,
}

pub struct PlatformCredentials {
    pub twitter: Credentials<TwitterCredentials>,
    pub cohost: Credentials<CohostCredentials>,
    pub tumblr: Credentials<TumblrCredentials>,
    pub mastodon: Credentials<MastodonCredentials>,
    pub bluesky: Credentials<BlueskyCredentials>,
}

pub struct Config {
    pub videos_dir: PathBuf,
    pub image_path: PathBuf,
    pub log_file: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    pub sampler: SamplerConfig,
    pub http_timeout: Duration,
    pub mastodon_poll_max_attempts: u32,
    pub platforms: PlatformCredentials,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_map(&std::env::vars().collect())
    }

    /// Build from an explicit variable map (useful for testing).
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let env = Env(vars);

        let videos_dir = PathBuf::from(env.required("VIDEOS_DIR")?);

        let max_attempts: u32 = env.parse_or("FRAME_MAX_ATTEMPTS", 1000)?;
        let sampler = SamplerConfig {
            // 0 表示不设上限（全黑视频会死循环）
            max_attempts: (max_attempts > 0).then_some(max_attempts),
            ..SamplerConfig::default()
        };

        let platforms = PlatformCredentials {
            twitter: warn_if_missing("Twitter", env.twitter()),
            cohost: warn_if_missing("Cohost", env.cohost()),
            tumblr: warn_if_missing("Tumblr", env.tumblr()),
            mastodon: warn_if_missing("Mastodon", env.mastodon()),
            bluesky: warn_if_missing("Bluesky", env.bluesky()),
        };

        Ok(Self {
            videos_dir,
            image_path: env.path_or("IMAGE_PATH", DEFAULT_IMAGE_PATH),
            log_file: env.path_or("LOG_FILE", DEFAULT_LOG_FILE),
            ffmpeg_path: env.path_or("FFMPEG_PATH", "ffmpeg"),
            ffprobe_path: env.path_or("FFPROBE_PATH", "ffprobe"),
            sampler,
            http_timeout: Duration::from_secs(
                env.parse_or("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
            ),
            mastodon_poll_max_attempts: env.parse_or(
                "MASTODON_POLL_MAX_ATTEMPTS",
                DEFAULT_MASTODON_POLL_MAX_ATTEMPTS,
            )?,
            platforms,
        })
    }

    /// Log file location, readable before the rest of the config is loaded.
    pub fn log_file_from_env() -> PathBuf {
        std::env::var("LOG_FILE")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
    }
}

struct Env<'a>(&'a HashMap<String, String>);

impl Env<'_> {
    fn optional(&self, var: &str) -> Option<String> {
        self.0
            .get(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, var: &str) -> Result<String, ConfigError> {
        self.optional(var).ok_or_else(|| ConfigError::Missing {
            var: var.to_string(),
        })
    }

    fn path_or(&self, var: &str, default: &str) -> PathBuf {
        PathBuf::from(self.optional(var).unwrap_or_else(|| default.to_string()))
    }

    fn parse_or<T>(&self, var: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(var) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var: var.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn twitter(&self) -> Credentials<TwitterCredentials> {
        Ok(TwitterCredentials {
            consumer_key: self.required("TWITTER_CONSUMER_KEY")?,
            consumer_secret: self.required("TWITTER_CONSUMER_SECRET")?,
            access_token: self.required("TWITTER_ACCESS_TOKEN_KEY")?,
            access_token_secret: self.required("TWITTER_ACCESS_TOKEN_SECRET")?,
        })
    }

    fn cohost(&self) -> Credentials<CohostCredentials> {
        Ok(CohostCredentials {
            email: self.required("COHOST_EMAIL")?,
            password: self.required("COHOST_PASSWORD")?,
            project: self.required("COHOST_PROJECT")?,
        })
    }

    fn tumblr(&self) -> Credentials<TumblrCredentials> {
        Ok(TumblrCredentials {
            consumer_key: self.required("TUMBLR_CONSUMER_KEY")?,
            consumer_secret: self.required("TUMBLR_CONSUMER_SECRET")?,
            oauth_token: self.required("TUMBLR_OAUTH_TOKEN")?,
            oauth_secret: self.required("TUMBLR_OAUTH_SECRET")?,
            blog: self.required("TUMBLR_BLOG")?,
        })
    }

    fn mastodon(&self) -> Credentials<MastodonCredentials> {
        Ok(MastodonCredentials {
            access_token: self.required("MASTODON_ACCESS_TOKEN")?,
            api_base_url: self.required("MASTODON_API_BASE_URL")?,
        })
    }

    fn bluesky(&self) -> Credentials<BlueskyCredentials> {
        Ok(BlueskyCredentials {
            handle: self.required("BSKY_HANDLE")?,
            password: self.required("BSKY_PASSWORD")?,
            pds_url: self
                .optional("BSKY_PDS_URL")
                .unwrap_or_else(|| DEFAULT_BSKY_PDS_URL.to_string()),
        })
    }
}

fn warn_if_missing<T>(platform: &str, creds: Credentials<T>) -> Credentials<T> {
    if let Err(e) = &creds {
        warn!("⚠️ {} disabled: {}", platform, e);
    }
    creds
}
