//! Live API Data Structures

use serde::{Deserialize, Serialize};

use livecast_core::models::{BroadcastId, Comment, CreatedBroadcast};

/// Broadcast and comment ids arrive as JSON numbers or strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(u64),
    Text(String),
}

impl RawId {
    #[must_use]
    pub fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// Envelope fields every response carries
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Status {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status.as_deref().is_none_or(|s| s == "ok")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateResponse {
    pub broadcast_id: RawId,
    pub upload_url: String,
}

impl From<CreateResponse> for CreatedBroadcast {
    fn from(resp: CreateResponse) -> Self {
        Self {
            broadcast_id: BroadcastId::new(resp.broadcast_id.into_string()),
            upload_url: resp.upload_url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentUser {
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawComment {
    pub pk: RawId,
    pub text: String,
    pub created_at: i64,
    pub user: CommentUser,
}

impl From<RawComment> for Comment {
    fn from(raw: RawComment) -> Self {
        Self {
            id: raw.pk.into_string(),
            username: raw.user.username,
            text: raw.text,
            created_at: raw.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentsResponse {
    /// Absent or null when nothing new arrived
    #[serde(default)]
    pub comments: Option<Vec<RawComment>>,
}
