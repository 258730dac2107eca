//! Live API client errors and response helpers

use livecast_core::StreamingError;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Largest response body the client will buffer (16 MB)
pub const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum LiveApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} answered {status}")]
    Status { status: StatusCode, url: String },

    /// The service answered with `status: "fail"`
    #[error("Service rejected the request: {0}")]
    Rejected(String),

    #[error("Session not accepted: {0}")]
    Unauthorized(String),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid client setup: {0}")]
    Setup(String),

    #[error("Response body of {0} bytes exceeds {MAX_BODY_BYTES}")]
    BodyTooLarge(u64),
}

impl From<url::ParseError> for LiveApiError {
    fn from(err: url::ParseError) -> Self {
        Self::Setup(format!("bad URL: {err}"))
    }
}

impl From<reqwest::header::InvalidHeaderValue> for LiveApiError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Self::Setup(format!("bad header: {err}"))
    }
}

/// Pass successful responses through; map everything else to an error.
/// 401 and 403 mean the session token is no longer accepted.
pub fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, LiveApiError> {
    let status = response.status();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(LiveApiError::Unauthorized(
            format!("{} answered {status}", response.url()),
        )),
        s if s.is_client_error() || s.is_server_error() => Err(LiveApiError::Status {
            status,
            url: response.url().to_string(),
        }),
        _ => Ok(response),
    }
}

/// Buffer at most [`MAX_BODY_BYTES`] of the body and decode it as JSON.
pub async fn json_with_limit<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, LiveApiError> {
    let declared = response.content_length().unwrap_or(0);
    if declared > MAX_BODY_BYTES {
        return Err(LiveApiError::BodyTooLarge(declared));
    }

    let body = response.bytes().await?;
    let size = body.len() as u64;
    if size > MAX_BODY_BYTES {
        return Err(LiveApiError::BodyTooLarge(size));
    }

    Ok(serde_json::from_slice(&body)?)
}

impl From<LiveApiError> for StreamingError {
    fn from(err: LiveApiError) -> Self {
        match err {
            LiveApiError::Transport(e) => Self::Network(e.to_string()),
            LiveApiError::Status { status, url } => Self::Http {
                status: status.as_u16(),
                message: url,
            },
            LiveApiError::Rejected(msg) => Self::Rejected(msg),
            LiveApiError::Unauthorized(msg) => Self::Auth(msg),
            LiveApiError::Decode(_) | LiveApiError::BodyTooLarge(_) => {
                Self::InvalidResponse(err.to_string())
            }
            LiveApiError::Setup(_) => Self::Rejected(err.to_string()),
        }
    }
}
