//! Twitter：v1.1 上传媒体 + alt text，v2 发推

use super::error::{check_status, PublishError};
use super::oauth1::OAuth1Signer;
use super::{Platform, PostImage, Publisher};
use crate::core::config::TwitterCredentials;
use log::{debug, info};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::{json, Value};

const MEDIA_UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";
const MEDIA_METADATA_URL: &str = "https://upload.twitter.com/1.1/media/metadata/create.json";
const CREATE_TWEET_URL: &str = "https://api.twitter.com/2/tweets";

#[derive(Debug, Deserialize)]
struct MediaUploadResponse {
    media_id_string: String,
}

pub struct TwitterPublisher {
    client: Client,
    creds: TwitterCredentials,
}

impl TwitterPublisher {
    pub fn new(client: Client, creds: TwitterCredentials) -> Self {
        Self { client, creds }
    }

    fn signer(&self) -> OAuth1Signer<'_> {
        OAuth1Signer::new(
            &self.creds.consumer_key,
            &self.creds.consumer_secret,
            &self.creds.access_token,
            &self.creds.access_token_secret,
        )
    }

    fn upload_media(&self, image: &PostImage) -> Result<String, PublishError> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(image.mime_type())?;
        let form = Form::new().part("media", part);

        let auth = self.signer().authorization("POST", MEDIA_UPLOAD_URL, &[])?;
        let resp = self
            .client
            .post(MEDIA_UPLOAD_URL)
            .header(AUTHORIZATION, auth)
            .multipart(form)
            .send()?;
        let upload: MediaUploadResponse = check_status(resp, "media/upload")?.json()?;

        debug!("Twitter media uploaded: {}", upload.media_id_string);
        Ok(upload.media_id_string)
    }

    fn post_json(&self, url: &str, endpoint: &str, body: &Value) -> Result<(), PublishError> {
        let auth = self.signer().authorization("POST", url, &[])?;
        let resp = self
            .client
            .post(url)
            .header(AUTHORIZATION, auth)
            .json(body)
            .send()?;
        check_status(resp, endpoint)?;
        Ok(())
    }
}

impl Publisher for TwitterPublisher {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    fn publish(&self, image: &PostImage, alt_text: &str) -> Result<(), PublishError> {
        let media_id = self.upload_media(image)?;
        self.post_json(
            MEDIA_METADATA_URL,
            "media/metadata/create",
            &metadata_body(&media_id, alt_text),
        )?;
        self.post_json(CREATE_TWEET_URL, "2/tweets", &tweet_body(&media_id))?;
        info!("🐦 Tweet created with media {}", media_id);
        Ok(())
    }
}

fn metadata_body(media_id: &str, alt_text: &str) -> Value {
    json!({
        "media_id": media_id,
        "alt_text": { "text": alt_text },
    })
}

fn tweet_body(media_id: &str) -> Value {
    json!({
        "media": { "media_ids": [media_id] },
    })
}
