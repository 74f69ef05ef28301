use crate::core::config::ConfigError;
use reqwest::blocking::Response;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Not configured: {0}")]
    Config(#[from] ConfigError),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("Unexpected response from {endpoint}: {reason}")]
    Response { endpoint: String, reason: String },
    #[error("Request signing failed: {0}")]
    Signing(String),
    #[error("Media still processing after {attempts} polls")]
    ProcessingTimeout { attempts: u32 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Publisher panicked: {0}")]
    Panicked(String),
}

/// 非 2xx 响应转成 [`PublishError::Api`]，保留响应体方便排查
pub(crate) fn check_status(resp: Response, endpoint: &str) -> Result<Response, PublishError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(PublishError::Api {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}
