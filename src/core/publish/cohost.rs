//! Cohost：cookie 会话 + 先建草稿、再传附件、最后发布

use super::error::{check_status, PublishError};
use super::{Platform, PostImage, Publisher};
use crate::core::config::CohostCredentials;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use log::{debug, info};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::header::{COOKIE, SET_COOKIE};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha384;
use std::collections::HashMap;

const API_BASE: &str = "https://cohost.org/api/v1";
const SESSION_COOKIE: &str = "connect.sid";
const LOGIN_HASH_ROUNDS: u32 = 200_000;
const LOGIN_HASH_LEN: usize = 128;
/// 草稿阶段附件 id 的占位值
const PLACEHOLDER_ATTACHMENT_ID: &str = "00000000-0000-0000-0000-000000000000";

const POST_STATE_DRAFT: u8 = 0;
const POST_STATE_PUBLISHED: u8 = 1;

/// 与 cohost 网页端一致：`-` / `_` 替换成 `A` 后按标准 base64 宽松解码
const SALT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Deserialize)]
struct SaltResponse {
    salt: String,
}

#[derive(Debug, Deserialize)]
struct CreatePostResponse {
    #[serde(rename = "postId")]
    post_id: u64,
}

#[derive(Debug, Deserialize)]
struct AttachStartResponse {
    #[serde(rename = "attachmentId")]
    attachment_id: String,
    url: String,
    #[serde(rename = "requiredFields", default)]
    required_fields: HashMap<String, String>,
}

pub struct CohostPublisher {
    client: Client,
    creds: CohostCredentials,
}

impl CohostPublisher {
    pub fn new(client: Client, creds: CohostCredentials) -> Self {
        Self { client, creds }
    }

    fn project_url(&self, path: &str) -> String {
        format!("{}/project/{}{}", API_BASE, self.creds.project, path)
    }

    /// Returns the `Cookie` header value for the authenticated session.
    fn login(&self) -> Result<String, PublishError> {
        let resp = self
            .client
            .get(format!("{}/login/salt", API_BASE))
            .query(&[("email", &self.creds.email)])
            .send()?;
        let salt: SaltResponse = check_status(resp, "login/salt")?.json()?;

        let client_hash = login_hash(&self.creds.password, &salt.salt, LOGIN_HASH_ROUNDS)?;
        let resp = self
            .client
            .post(format!("{}/login", API_BASE))
            .json(&json!({ "email": self.creds.email, "clientHash": client_hash }))
            .send()?;
        let resp = check_status(resp, "login")?;

        resp.headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(session_cookie)
            .ok_or_else(|| PublishError::Response {
                endpoint: "login".to_string(),
                reason: format!("no {} cookie in response", SESSION_COOKIE),
            })
    }

    fn create_draft(&self, cookie: &str, alt_text: &str) -> Result<u64, PublishError> {
        let body = post_body(POST_STATE_DRAFT, PLACEHOLDER_ATTACHMENT_ID, alt_text);
        let resp = self
            .client
            .post(self.project_url("/posts"))
            .header(COOKIE, cookie)
            .json(&body)
            .send()?;
        let created: CreatePostResponse = check_status(resp, "posts")?.json()?;
        Ok(created.post_id)
    }

    fn attach(
        &self,
        cookie: &str,
        post_id: u64,
        image: &PostImage,
    ) -> Result<String, PublishError> {
        let resp = self
            .client
            .post(self.project_url(&format!("/posts/{}/attach/start", post_id)))
            .header(COOKIE, cookie)
            .json(&json!({
                "filename": image.file_name,
                "content_type": image.mime_type(),
                "content_length": image.bytes.len(),
            }))
            .send()?;
        let start: AttachStartResponse = check_status(resp, "attach/start")?.json()?;

        // 直传对象存储：不带会话 cookie，签名字段必须排在文件之前
        let mut form = Form::new();
        for (key, value) in &start.required_fields {
            form = form.text(key.clone(), value.clone());
        }
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(image.mime_type())?;
        let resp = self
            .client
            .post(&start.url)
            .multipart(form.part("file", part))
            .send()?;
        check_status(resp, "attachment upload")?;

        let resp = self
            .client
            .post(self.project_url(&format!(
                "/posts/{}/attach/finish/{}",
                post_id, start.attachment_id
            )))
            .header(COOKIE, cookie)
            .send()?;
        check_status(resp, "attach/finish")?;

        debug!("Cohost attachment {} uploaded", start.attachment_id);
        Ok(start.attachment_id)
    }
}

impl Publisher for CohostPublisher {
    fn platform(&self) -> Platform {
        Platform::Cohost
    }

    fn publish(&self, image: &PostImage, alt_text: &str) -> Result<(), PublishError> {
        let cookie = self.login()?;
        let post_id = self.create_draft(&cookie, alt_text)?;
        let attachment_id = self.attach(&cookie, post_id, image)?;

        let resp = self
            .client
            .put(self.project_url(&format!("/posts/{}", post_id)))
            .header(COOKIE, &cookie)
            .json(&post_body(POST_STATE_PUBLISHED, &attachment_id, alt_text))
            .send()?;
        check_status(resp, "posts (publish)")?;

        info!("🟠 Cohost post {} published on {}", post_id, self.creds.project);
        Ok(())
    }
}

/// `base64(PBKDF2-HMAC-SHA384(password, salt, rounds, 128 bytes))`
fn login_hash(password: &str, salt: &str, rounds: u32) -> Result<String, PublishError> {
    let salt = normalize_salt(salt);
    let salt = SALT_ENGINE
        .decode(salt.trim_end_matches('='))
        .map_err(|e| PublishError::Response {
            endpoint: "login/salt".to_string(),
            reason: format!("salt is not base64: {}", e),
        })?;

    let mut hash = [0u8; LOGIN_HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha384>(password.as_bytes(), &salt, rounds, &mut hash);
    Ok(STANDARD.encode(hash))
}

fn normalize_salt(salt: &str) -> String {
    salt.trim().replace(['-', '_'], "A")
}

/// `connect.sid=abc; Path=/; HttpOnly` -> `connect.sid=abc`
fn session_cookie(set_cookie: &str) -> Option<String> {
    let pair = set_cookie.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    (name == SESSION_COOKIE && !value.is_empty()).then(|| pair.to_string())
}

fn post_body(post_state: u8, attachment_id: &str, alt_text: &str) -> Value {
    json!({
        "postState": post_state,
        "headline": "",
        "adultContent": false,
        "blocks": [
            {
                "type": "attachment",
                "attachment": { "attachmentId": attachment_id, "altText": alt_text },
            }
        ],
        "cws": [],
        "tags": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_hash_shape() {
        let hash = login_hash("hunter2", "c2FsdHlzYWx0c2FsdA", 10).unwrap();
        // 128 字节 -> 172 个 base64 字符
        assert_eq!(hash.len(), 172);
        assert_eq!(STANDARD.decode(&hash).unwrap().len(), LOGIN_HASH_LEN);
    }

    #[test]
    fn test_login_hash_is_deterministic_and_salted() {
        let a = login_hash("hunter2", "c2FsdHlzYWx0c2FsdA==", 10).unwrap();
        let b = login_hash("hunter2", "c2FsdHlzYWx0c2FsdA", 10).unwrap();
        let c = login_hash("hunter2", "b3RoZXJzYWx0", 10).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_url_safe_salt_characters_become_a() {
        assert_eq!(normalize_salt(" ab-c_d "), "abAcAd");
        let mixed = login_hash("hunter2", "c2Fs-HlzYWx0_2FsdA", 10).unwrap();
        let replaced = login_hash("hunter2", "c2FsAHlzYWx0A2FsdA", 10).unwrap();
        assert_eq!(mixed, replaced);
    }

    #[test]
    fn test_login_hash_rejects_bad_salt() {
        assert!(login_hash("hunter2", "not base64!!", 10).is_err());
    }

    #[test]
    fn test_session_cookie() {
        assert_eq!(
            session_cookie("connect.sid=s%3Aabc.def; Path=/; HttpOnly; Secure"),
            Some("connect.sid=s%3Aabc.def".to_string())
        );
        assert_eq!(session_cookie("other=1; Path=/"), None);
        assert_eq!(session_cookie("connect.sid=; Path=/"), None);
    }

    #[test]
    fn test_draft_and_publish_bodies() {
        let draft = post_body(POST_STATE_DRAFT, PLACEHOLDER_ATTACHMENT_ID, "clip01 (00:02:05)");
        assert_eq!(draft["postState"], 0);
        assert_eq!(draft["headline"], "");
        let block = &draft["blocks"][0];
        assert_eq!(block["type"], "attachment");
        assert_eq!(block["attachment"]["attachmentId"], PLACEHOLDER_ATTACHMENT_ID);
        assert_eq!(block["attachment"]["altText"], "clip01 (00:02:05)");

        let published = post_body(POST_STATE_PUBLISHED, "a1b2", "clip01 (00:02:05)");
        assert_eq!(published["postState"], 1);
        assert_eq!(published["blocks"][0]["attachment"]["attachmentId"], "a1b2");
    }

    #[test]
    fn test_attach_start_parsing() {
        let raw = r#"{
            "attachmentId": "a1b2",
            "url": "https://staging.cohostcdn.org/",
            "requiredFields": { "key": "attachment/a1b2/image.jpg", "Policy": "xyz" }
        }"#;
        let parsed: AttachStartResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.attachment_id, "a1b2");
        assert_eq!(parsed.required_fields.len(), 2);
    }
}
