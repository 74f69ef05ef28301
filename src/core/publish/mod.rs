//! 多平台发布：每个平台一个 [`Publisher`]，按固定顺序逐个尝试

pub mod bluesky;
pub mod cohost;
pub mod error;
pub mod fanout;
pub mod mastodon;
pub mod oauth1;
pub mod tumblr;
pub mod twitter;

pub use error::PublishError;
pub use fanout::{PublishFanOut, PublishOutcome, PublishReport};

use crate::core::config::{ConfigError, Credentials, PlatformCredentials};
use reqwest::blocking::Client;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Twitter,
    Cohost,
    Tumblr,
    Mastodon,
    Bluesky,
}

impl Platform {
    /// 发布顺序
    pub const ALL: [Platform; 5] = [
        Platform::Twitter,
        Platform::Cohost,
        Platform::Tumblr,
        Platform::Mastodon,
        Platform::Bluesky,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Twitter => "Twitter",
            Platform::Cohost => "Cohost",
            Platform::Tumblr => "Tumblr",
            Platform::Mastodon => "Mastodon",
            Platform::Bluesky => "Bluesky",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 待发布图片：读一次，所有平台共享同一份字节
#[derive(Debug, Clone)]
pub struct PostImage {
    pub path: PathBuf,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl PostImage {
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(path, bytes))
    }

    pub fn from_bytes(path: &Path, bytes: Vec<u8>) -> Self {
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "image.jpg".to_string());
        Self {
            path: path.to_path_buf(),
            file_name,
            bytes,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("png") => "image/png",
            _ => "image/jpeg",
        }
    }
}

/// One platform's upload-and-post flow.
pub trait Publisher {
    fn platform(&self) -> Platform;

    /// Upload `image`, attach `alt_text`, create an empty-bodied post.
    fn publish(&self, image: &PostImage, alt_text: &str) -> Result<(), PublishError>;
}

/// 凭据不完整的平台：不发任何请求，直接报配置错误
pub struct UnconfiguredPublisher {
    platform: Platform,
    error: ConfigError,
}

impl UnconfiguredPublisher {
    pub fn new(platform: Platform, error: ConfigError) -> Self {
        Self { platform, error }
    }
}

impl Publisher for UnconfiguredPublisher {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn publish(&self, _image: &PostImage, _alt_text: &str) -> Result<(), PublishError> {
        Err(PublishError::Config(self.error.clone()))
    }
}

pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("randochrontendo/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
}

/// Publishers in [`Platform::ALL`] order.
pub fn build_publishers(
    platforms: &PlatformCredentials,
    client: &Client,
    mastodon_poll_max_attempts: u32,
) -> Vec<Box<dyn Publisher>> {
    vec![
        slot(Platform::Twitter, &platforms.twitter, |c| {
            Box::new(twitter::TwitterPublisher::new(client.clone(), c))
        }),
        slot(Platform::Cohost, &platforms.cohost, |c| {
            Box::new(cohost::CohostPublisher::new(client.clone(), c))
        }),
        slot(Platform::Tumblr, &platforms.tumblr, |c| {
            Box::new(tumblr::TumblrPublisher::new(client.clone(), c))
        }),
        slot(Platform::Mastodon, &platforms.mastodon, |c| {
            Box::new(mastodon::MastodonPublisher::new(
                client.clone(),
                c,
                mastodon::PollSchedule::doubling(mastodon_poll_max_attempts),
            ))
        }),
        slot(Platform::Bluesky, &platforms.bluesky, |c| {
            Box::new(bluesky::BlueskyPublisher::new(client.clone(), c))
        }),
    ]
}

fn slot<T: Clone, F>(platform: Platform, creds: &Credentials<T>, build: F) -> Box<dyn Publisher>
where
    F: FnOnce(T) -> Box<dyn Publisher>,
{
    match creds {
        Ok(c) => build(c.clone()),
        Err(e) => Box::new(UnconfiguredPublisher::new(platform, e.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use std::collections::HashMap;

    #[test]
    fn test_platform_order() {
        let names: Vec<_> = Platform::ALL.iter().map(|p| p.to_string()).collect();
        assert_eq!(names, ["Twitter", "Cohost", "Tumblr", "Mastodon", "Bluesky"]);
    }

    #[test]
    fn test_post_image_mime_type() {
        let jpg = PostImage::from_bytes(Path::new("/tmp/image.jpg"), vec![1, 2, 3]);
        assert_eq!(jpg.mime_type(), "image/jpeg");
        assert_eq!(jpg.file_name, "image.jpg");

        let png = PostImage::from_bytes(Path::new("frame.PNG"), vec![]);
        assert_eq!(png.mime_type(), "image/png");
    }

    #[test]
    fn test_unconfigured_publisher_fails_without_network() {
        let publisher = UnconfiguredPublisher::new(
            Platform::Tumblr,
            ConfigError::Missing {
                var: "TUMBLR_BLOG".to_string(),
            },
        );
        let image = PostImage::from_bytes(Path::new("image.jpg"), vec![0xFF, 0xD8]);
        let err = publisher.publish(&image, "clip01 (00:00:01)").unwrap_err();
        assert!(matches!(err, PublishError::Config(ConfigError::Missing { .. })));
        assert_eq!(publisher.platform(), Platform::Tumblr);
    }

    #[test]
    fn test_build_publishers_keeps_order_with_gaps() {
        let vars: HashMap<String, String> = [
            ("VIDEOS_DIR", "/srv/videos"),
            ("MASTODON_ACCESS_TOKEN", "token"),
            ("MASTODON_API_BASE_URL", "https://example.social"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let config = Config::from_map(&vars).unwrap();
        let client = build_http_client(Duration::from_secs(5)).unwrap();

        let publishers = build_publishers(&config.platforms, &client, 3);
        let order: Vec<_> = publishers.iter().map(|p| p.platform()).collect();
        assert_eq!(order, Platform::ALL);
    }
}
