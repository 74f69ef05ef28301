//! Mastodon：上传媒体后需要轮询，等服务端处理完成拿到 url 才能发嘟文

use super::error::{check_status, PublishError};
use super::{Platform, PostImage, Publisher};
use crate::core::config::MastodonCredentials;
use log::{debug, info};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct MediaAttachment {
    id: String,
    url: Option<String>,
}

/// Delays between media-processing polls: `initial`, then doubling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSchedule {
    pub initial: Duration,
    pub max_attempts: u32,
}

impl PollSchedule {
    pub fn doubling(max_attempts: u32) -> Self {
        Self {
            initial: Duration::from_secs(1),
            max_attempts,
        }
    }

    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let initial = self.initial;
        (0..self.max_attempts).map(move |i| initial.saturating_mul(1u32 << i.min(31)))
    }

    /// Re-fetches `media` through `fetch` until its `url` is set, at most
    /// `max_attempts` times.
    fn wait_until_processed<F>(
        &self,
        media: MediaAttachment,
        mut fetch: F,
    ) -> Result<MediaAttachment, PublishError>
    where
        F: FnMut(&str) -> Result<MediaAttachment, PublishError>,
    {
        if media.url.is_some() {
            return Ok(media);
        }
        for (attempt, delay) in self.delays().enumerate() {
            debug!(
                "Mastodon media {} still processing, retry {} in {:?}",
                media.id,
                attempt + 1,
                delay
            );
            std::thread::sleep(delay);
            let current = fetch(&media.id)?;
            if current.url.is_some() {
                return Ok(current);
            }
        }
        Err(PublishError::ProcessingTimeout {
            attempts: self.max_attempts,
        })
    }
}

pub struct MastodonPublisher {
    client: Client,
    creds: MastodonCredentials,
    poll: PollSchedule,
}

impl MastodonPublisher {
    pub fn new(client: Client, creds: MastodonCredentials, poll: PollSchedule) -> Self {
        Self {
            client,
            creds,
            poll,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.creds.api_base_url.trim_end_matches('/'), path)
    }

    fn upload_media(
        &self,
        image: &PostImage,
        description: &str,
    ) -> Result<MediaAttachment, PublishError> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(image.mime_type())?;
        let form = Form::new()
            .part("file", part)
            .text("description", description.to_string());

        let resp = self
            .client
            .post(self.url("/api/v2/media"))
            .bearer_auth(&self.creds.access_token)
            .multipart(form)
            .send()?;
        Ok(check_status(resp, "api/v2/media")?.json()?)
    }

    fn fetch_media(&self, id: &str) -> Result<MediaAttachment, PublishError> {
        let resp = self
            .client
            .get(self.url(&format!("/api/v1/media/{}", id)))
            .bearer_auth(&self.creds.access_token)
            .send()?;
        Ok(check_status(resp, "api/v1/media")?.json()?)
    }

    /// 202/206 期间 url 为 null，按退避间隔轮询
    fn wait_until_processed(
        &self,
        media: MediaAttachment,
    ) -> Result<MediaAttachment, PublishError> {
        self.poll.wait_until_processed(media, |id| self.fetch_media(id))
    }
}

impl Publisher for MastodonPublisher {
    fn platform(&self) -> Platform {
        Platform::Mastodon
    }

    fn publish(&self, image: &PostImage, alt_text: &str) -> Result<(), PublishError> {
        let uploaded = self.upload_media(image, alt_text)?;
        let media = self.wait_until_processed(uploaded)?;

        let resp = self
            .client
            .post(self.url("/api/v1/statuses"))
            .bearer_auth(&self.creds.access_token)
            .json(&json!({ "status": "", "media_ids": [media.id] }))
            .send()?;
        check_status(resp, "api/v1/statuses")?;

        info!("🐘 Mastodon status posted with media {}", media.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_schedule_doubles() {
        let delays: Vec<_> = PollSchedule::doubling(5).delays().map(|d| d.as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16]);
    }

    #[test]
    fn test_poll_schedule_is_bounded() {
        assert_eq!(PollSchedule::doubling(0).delays().count(), 0);
        assert_eq!(PollSchedule::doubling(8).delays().count(), 8);
        let total: u64 = PollSchedule::doubling(8).delays().map(|d| d.as_secs()).sum();
        assert_eq!(total, 255);
    }

    #[test]
    fn test_media_attachment_processing_state() {
        let processing: MediaAttachment = serde_json::from_str(
            r#"{"id":"22348641","type":"image","url":null,"preview_url":null}"#,
        )
        .unwrap();
        assert_eq!(processing.id, "22348641");
        assert!(processing.url.is_none());

        let done: MediaAttachment = serde_json::from_str(
            r#"{"id":"22348641","type":"image","url":"https://files.example/original/a.jpg"}"#,
        )
        .unwrap();
        assert!(done.url.is_some());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = super::super::build_http_client(Duration::from_secs(1)).unwrap();
        let publisher = MastodonPublisher::new(
            client,
            MastodonCredentials {
                access_token: "t".to_string(),
                api_base_url: "https://botsin.space/".to_string(),
            },
            PollSchedule::doubling(1),
        );
        assert_eq!(
            publisher.url("/api/v2/media"),
            "https://botsin.space/api/v2/media"
        );
    }

    fn media(id: &str, url: Option<&str>) -> MediaAttachment {
        MediaAttachment {
            id: id.to_string(),
            url: url.map(str::to_string),
        }
    }

    fn no_wait(max_attempts: u32) -> PollSchedule {
        PollSchedule {
            initial: Duration::ZERO,
            max_attempts,
        }
    }

    #[test]
    fn test_ready_media_is_not_polled() {
        let mut polls = 0;
        let done = no_wait(8)
            .wait_until_processed(media("7", Some("https://files.example/a.jpg")), |id| {
                polls += 1;
                Ok(media(id, None))
            })
            .unwrap();
        assert_eq!(polls, 0);
        assert_eq!(done.id, "7");
    }

    #[test]
    fn test_polls_until_url_is_set() {
        let mut polls = 0;
        let done = no_wait(8)
            .wait_until_processed(media("7", None), |id| {
                polls += 1;
                let url = (polls == 2).then_some("https://files.example/a.jpg");
                Ok(media(id, url))
            })
            .unwrap();
        assert_eq!(polls, 2);
        assert!(done.url.is_some());
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut polls = 0;
        let result = no_wait(2).wait_until_processed(media("7", None), |id| {
            polls += 1;
            Ok(media(id, None))
        });
        assert_eq!(polls, 2);
        assert!(matches!(
            result,
            Err(PublishError::ProcessingTimeout { attempts: 2 })
        ));
    }

    #[test]
    fn test_zero_attempts_times_out_without_fetching() {
        let mut polls = 0;
        let result = no_wait(0).wait_until_processed(media("7", None), |id| {
            polls += 1;
            Ok(media(id, None))
        });
        assert_eq!(polls, 0);
        assert!(matches!(
            result,
            Err(PublishError::ProcessingTimeout { attempts: 0 })
        ));
    }

    #[test]
    fn test_fetch_error_stops_polling() {
        let mut polls = 0;
        let result = no_wait(5).wait_until_processed(media("7", None), |_| {
            polls += 1;
            Err(PublishError::Api {
                endpoint: "api/v1/media".to_string(),
                status: 404,
                body: "not found".to_string(),
            })
        });
        assert_eq!(polls, 1);
        assert!(matches!(result, Err(PublishError::Api { status: 404, .. })));
    }
}
