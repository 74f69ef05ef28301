//! Bluesky (AT Protocol) over plain XRPC calls.

use super::error::{check_status, PublishError};
use super::{Platform, PostImage, Publisher};
use crate::core::config::BlueskyCredentials;
use chrono::{SecondsFormat, Utc};
use log::info;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{json, Value};

const POST_COLLECTION: &str = "app.bsky.feed.post";

#[derive(Debug, Deserialize)]
struct Session {
    #[serde(rename = "accessJwt")]
    access_jwt: String,
    did: String,
}

#[derive(Debug, Deserialize)]
struct UploadBlobResponse {
    blob: Value,
}

pub struct BlueskyPublisher {
    client: Client,
    creds: BlueskyCredentials,
}

impl BlueskyPublisher {
    pub fn new(client: Client, creds: BlueskyCredentials) -> Self {
        Self { client, creds }
    }

    fn xrpc(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.creds.pds_url.trim_end_matches('/'), method)
    }

    fn create_session(&self) -> Result<Session, PublishError> {
        let resp = self
            .client
            .post(self.xrpc("com.atproto.server.createSession"))
            .json(&json!({
                "identifier": self.creds.handle,
                "password": self.creds.password,
            }))
            .send()?;
        Ok(check_status(resp, "createSession")?.json()?)
    }

    fn upload_blob(&self, session: &Session, image: &PostImage) -> Result<Value, PublishError> {
        let resp = self
            .client
            .post(self.xrpc("com.atproto.repo.uploadBlob"))
            .bearer_auth(&session.access_jwt)
            .header(CONTENT_TYPE, image.mime_type())
            .body(image.bytes.clone())
            .send()?;
        let upload: UploadBlobResponse = check_status(resp, "uploadBlob")?.json()?;
        Ok(upload.blob)
    }
}

impl Publisher for BlueskyPublisher {
    fn platform(&self) -> Platform {
        Platform::Bluesky
    }

    fn publish(&self, image: &PostImage, alt_text: &str) -> Result<(), PublishError> {
        let session = self.create_session()?;
        let blob = self.upload_blob(&session, image)?;

        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let body = create_record_body(&session.did, blob, alt_text, &created_at);

        let resp = self
            .client
            .post(self.xrpc("com.atproto.repo.createRecord"))
            .bearer_auth(&session.access_jwt)
            .json(&body)
            .send()?;
        check_status(resp, "createRecord")?;

        info!("🦋 Bluesky post created for {}", self.creds.handle);
        Ok(())
    }
}

fn create_record_body(did: &str, blob: Value, alt_text: &str, created_at: &str) -> Value {
    json!({
        "repo": did,
        "collection": POST_COLLECTION,
        "record": {
            "$type": POST_COLLECTION,
            "text": "",
            "createdAt": created_at,
            "embed": {
                "$type": "app.bsky.embed.images",
                "images": [
                    { "alt": alt_text, "image": blob }
                ],
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blob() -> Value {
        json!({
            "$type": "blob",
            "ref": { "$link": "bafkreibabalobzn6cd366ukcsjycp4yymjymgfxcv6xczmlgpemzkz3cfa" },
            "mimeType": "image/jpeg",
            "size": 760898
        })
    }

    #[test]
    fn test_record_shape() {
        let body = create_record_body(
            "did:plc:abc123",
            sample_blob(),
            "clip01 (00:02:05)",
            "2024-01-01T00:00:00.000Z",
        );

        assert_eq!(body["repo"], "did:plc:abc123");
        assert_eq!(body["collection"], "app.bsky.feed.post");

        let record = &body["record"];
        assert_eq!(record["$type"], "app.bsky.feed.post");
        assert_eq!(record["text"], "");
        assert_eq!(record["createdAt"], "2024-01-01T00:00:00.000Z");

        let images = record["embed"]["images"].as_array().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0]["alt"], "clip01 (00:02:05)");
        assert_eq!(images[0]["image"], sample_blob());
        assert_eq!(record["embed"]["$type"], "app.bsky.embed.images");
    }

    #[test]
    fn test_session_parsing() {
        let raw = r#"{"did":"did:plc:abc123","handle":"rando.bsky.social","accessJwt":"jwt-a","refreshJwt":"jwt-r"}"#;
        let session: Session = serde_json::from_str(raw).unwrap();
        assert_eq!(session.did, "did:plc:abc123");
        assert_eq!(session.access_jwt, "jwt-a");
    }
}
