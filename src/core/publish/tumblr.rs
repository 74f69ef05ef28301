use super::error::{check_status, PublishError};
use super::oauth1::OAuth1Signer;
use super::{Platform, PostImage, Publisher};
use crate::core::config::TumblrCredentials;
use log::info;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;

const API_BASE: &str = "https://api.tumblr.com/v2";

pub struct TumblrPublisher {
    client: Client,
    creds: TumblrCredentials,
}

impl TumblrPublisher {
    pub fn new(client: Client, creds: TumblrCredentials) -> Self {
        Self { client, creds }
    }

    fn post_url(&self) -> String {
        format!("{}/blog/{}/post", API_BASE, blog_identifier(&self.creds.blog))
    }
}

impl Publisher for TumblrPublisher {
    fn platform(&self) -> Platform {
        Platform::Tumblr
    }

    /// Legacy photo post; the alt text doubles as the caption.
    fn publish(&self, image: &PostImage, alt_text: &str) -> Result<(), PublishError> {
        let url = self.post_url();

        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(image.mime_type())?;
        let form = Form::new()
            .text("type", "photo")
            .text("caption", alt_text.to_string())
            .part("data[0]", part);

        // multipart 参数不参与签名
        let auth = OAuth1Signer::new(
            &self.creds.consumer_key,
            &self.creds.consumer_secret,
            &self.creds.oauth_token,
            &self.creds.oauth_secret,
        )
        .authorization("POST", &url, &[])?;

        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, auth)
            .multipart(form)
            .send()?;
        check_status(resp, "blog/post")?;

        info!("📝 Tumblr photo posted to {}", self.creds.blog);
        Ok(())
    }
}

/// Bare blog names get the `.tumblr.com` suffix; custom domains pass through.
fn blog_identifier(blog: &str) -> String {
    let blog = blog.trim();
    if blog.contains('.') {
        blog.to_string()
    } else {
        format!("{}.tumblr.com", blog)
    }
}
