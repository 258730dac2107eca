//! Live streaming service HTTP Client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT},
    Client,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use livecast_core::config::ServiceConfig;
use livecast_core::models::{BroadcastId, Comment, CreateBroadcastRequest, CreatedBroadcast};
use livecast_core::{CommentFeed, StreamingClient, StreamingError};

use super::types::{CommentsResponse, CreateResponse, Status};
use crate::error::{ensure_success, json_with_limit, LiveApiError};

/// Message the service sends when the session token is no longer valid
const LOGIN_REQUIRED: &str = "login_required";

/// URL-encode a string for safe use as a path segment
fn url_encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// HTTP client for the live streaming service
pub struct LiveClient {
    base_url: Url,
    token: Option<String>,
    user_agent: String,
    client: Client,
}

impl LiveClient {
    /// Create a client with default timeouts
    pub fn new(base_url: &str) -> Result<Self, LiveApiError> {
        Self::from_config(&ServiceConfig {
            base_url: base_url.to_string(),
            ..ServiceConfig::default()
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, LiveApiError> {
        // Redirects are disabled so a session token never follows a redirect to another host.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .pool_max_idle_per_host(4)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| LiveApiError::Setup(e.to_string()))?;

        Ok(Self {
            base_url: normalize_base(&config.base_url)?,
            token: config.session_token.clone(),
            user_agent: config.user_agent.clone(),
            client,
        })
    }

    /// Set the session token sent with every request
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, LiveApiError> {
        Ok(self.base_url.join(path)?)
    }

    fn broadcast_endpoint(&self, id: &BroadcastId, action: &str) -> Result<Url, LiveApiError> {
        self.endpoint(&format!("live/{}/{action}/", url_encode(id.as_str())))
    }

    fn build_headers(&self) -> Result<HeaderMap, LiveApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&self.user_agent)?);

        if let Some(ref token) = self.token {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        }

        Ok(headers)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        url: Url,
        form: &[(&str, String)],
    ) -> Result<T, LiveApiError> {
        debug!(url = %url, "POST");
        let response = self
            .client
            .post(url)
            .headers(self.build_headers()?)
            .form(form)
            .send()
            .await?;

        read_ok(response).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, LiveApiError> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .headers(self.build_headers()?)
            .query(query)
            .send()
            .await?;

        read_ok(response).await
    }

    /// Create a broadcast in RTMP mode
    pub async fn create(
        &self,
        request: &CreateBroadcastRequest,
    ) -> Result<CreatedBroadcast, LiveApiError> {
        let mut form = vec![
            ("preview_width", request.preview_width.to_string()),
            ("preview_height", request.preview_height.to_string()),
            ("broadcast_type", "RTMP".to_string()),
        ];
        if let Some(ref message) = request.message {
            form.push(("broadcast_message", message.clone()));
        }

        let resp: CreateResponse = self.post_form(self.endpoint("live/create/")?, &form).await?;
        Ok(resp.into())
    }

    async fn broadcast_action(&self, id: &BroadcastId, action: &str) -> Result<(), LiveApiError> {
        let _: Value = self
            .post_form(self.broadcast_endpoint(id, action)?, &[])
            .await?;
        Ok(())
    }

    pub async fn start(&self, id: &BroadcastId) -> Result<(), LiveApiError> {
        self.broadcast_action(id, "start").await
    }

    pub async fn unmute_comment(&self, id: &BroadcastId) -> Result<(), LiveApiError> {
        self.broadcast_action(id, "unmute_comment").await
    }

    pub async fn end(&self, id: &BroadcastId) -> Result<(), LiveApiError> {
        self.broadcast_action(id, "end_broadcast").await
    }

    pub async fn add_to_post_live(&self, id: &BroadcastId) -> Result<(), LiveApiError> {
        self.broadcast_action(id, "add_to_post_live").await
    }

    pub async fn logout(&self) -> Result<(), LiveApiError> {
        let _: Value = self.post_form(self.endpoint("accounts/logout/")?, &[]).await?;
        Ok(())
    }

    /// Comments newer than `last_comment_ts` (Unix seconds)
    pub async fn get_comments(
        &self,
        id: &BroadcastId,
        last_comment_ts: Option<i64>,
    ) -> Result<Vec<Comment>, LiveApiError> {
        let query = [("last_comment_ts", last_comment_ts.unwrap_or(0).to_string())];
        let resp: CommentsResponse = self
            .get(self.broadcast_endpoint(id, "get_comment")?, &query)
            .await?;

        Ok(resp
            .comments
            .unwrap_or_default()
            .into_iter()
            .map(Comment::from)
            .collect())
    }
}

/// `join` replaces the last path segment unless the base ends with a slash
fn normalize_base(base_url: &str) -> Result<Url, LiveApiError> {
    let trimmed = base_url.trim();
    if trimmed.ends_with('/') {
        Ok(Url::parse(trimmed)?)
    } else {
        Ok(Url::parse(&format!("{trimmed}/"))?)
    }
}

/// Check status, read the bounded body and unwrap the `status` envelope
async fn read_ok<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, LiveApiError> {
    let response = ensure_success(response)?;
    let body: Value = json_with_limit(response).await?;

    let status: Status = serde_json::from_value(body.clone())?;
    if !status.is_ok() {
        let message = status.message.unwrap_or_else(|| "request failed".to_string());
        if message == LOGIN_REQUIRED {
            return Err(LiveApiError::Unauthorized(message));
        }
        return Err(LiveApiError::Rejected(message));
    }

    Ok(serde_json::from_value(body)?)
}

#[async_trait]
impl StreamingClient for LiveClient {
    async fn create_broadcast(
        &self,
        request: &CreateBroadcastRequest,
    ) -> Result<CreatedBroadcast, StreamingError> {
        Ok(self.create(request).await?)
    }

    async fn start_broadcast(&self, broadcast_id: &BroadcastId) -> Result<(), StreamingError> {
        Ok(self.start(broadcast_id).await?)
    }

    async fn enable_comments(&self, broadcast_id: &BroadcastId) -> Result<(), StreamingError> {
        Ok(self.unmute_comment(broadcast_id).await?)
    }

    async fn end_broadcast(&self, broadcast_id: &BroadcastId) -> Result<(), StreamingError> {
        Ok(self.end(broadcast_id).await?)
    }

    async fn archive_post_live(&self, broadcast_id: &BroadcastId) -> Result<(), StreamingError> {
        Ok(self.add_to_post_live(broadcast_id).await?)
    }

    async fn logout_account(&self) -> Result<(), StreamingError> {
        Ok(self.logout().await?)
    }
}

#[async_trait]
impl CommentFeed for LiveClient {
    async fn fetch_comments(
        &self,
        broadcast_id: &BroadcastId,
        since: Option<i64>,
    ) -> Result<Vec<Comment>, StreamingError> {
        Ok(self.get_comments(broadcast_id, since).await?)
    }
}
