// Streaming Service Interfaces
//
// The controller only sees the service through these traits. The HTTP
// implementation lives in livecast-providers; tests plug in mocks.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    BroadcastId, Comment, CreateBroadcastRequest, CreatedBroadcast, IngestCredentials,
};

/// Failure reported by a streaming-service call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamingError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Remote streaming service
///
/// Every call may fail; none are retried by the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamingClient: Send + Sync {
    /// Create a broadcast and return its id and upload endpoint
    async fn create_broadcast(
        &self,
        request: &CreateBroadcastRequest,
    ) -> Result<CreatedBroadcast, StreamingError>;

    /// Split a creation response into display-facing ingest credentials
    fn derive_ingest_credentials(
        &self,
        created: &CreatedBroadcast,
    ) -> Result<IngestCredentials, StreamingError> {
        crate::ingest::derive_ingest_credentials(created)
    }

    /// Mark the broadcast as started (viewers can join)
    async fn start_broadcast(&self, broadcast_id: &BroadcastId) -> Result<(), StreamingError>;

    /// Turn on comment delivery. Only valid after `start_broadcast`.
    async fn enable_comments(&self, broadcast_id: &BroadcastId) -> Result<(), StreamingError>;

    async fn end_broadcast(&self, broadcast_id: &BroadcastId) -> Result<(), StreamingError>;

    /// Convert an ended broadcast into a replay
    async fn archive_post_live(&self, broadcast_id: &BroadcastId) -> Result<(), StreamingError>;

    async fn logout_account(&self) -> Result<(), StreamingError>;
}

/// Source of viewer comments for a live broadcast
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentFeed: Send + Sync {
    /// Fetch comments newer than `since` (Unix seconds); all recent ones when `None`
    async fn fetch_comments(
        &self,
        broadcast_id: &BroadcastId,
        since: Option<i64>,
    ) -> Result<Vec<Comment>, StreamingError>;
}
