use serde::{Deserialize, Serialize};

/// Width of the portrait preview requested at broadcast creation
pub const DEFAULT_PREVIEW_WIDTH: u32 = 720;

/// Height of the portrait preview requested at broadcast creation
pub const DEFAULT_PREVIEW_HEIGHT: u32 = 1280;

/// Remote broadcast identifier
///
/// Opaque to the controller; only ever compared and passed back to the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BroadcastId(pub String);

impl BroadcastId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BroadcastId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for BroadcastId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BroadcastId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Parameters of a "create broadcast" request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBroadcastRequest {
    pub preview_width: u32,
    pub preview_height: u32,
    /// Broadcast message. The service accepts it but does not show it anywhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CreateBroadcastRequest {
    /// 720x1280 portrait request with an optional message
    #[must_use]
    pub fn portrait(message: Option<String>) -> Self {
        Self {
            preview_width: DEFAULT_PREVIEW_WIDTH,
            preview_height: DEFAULT_PREVIEW_HEIGHT,
            message,
        }
    }

    /// Whether the preview dimensions are exactly 9:16
    #[must_use]
    pub const fn is_portrait(&self) -> bool {
        self.preview_width > 0
            && (self.preview_width as u64) * 16 == (self.preview_height as u64) * 9
    }
}

impl Default for CreateBroadcastRequest {
    fn default() -> Self {
        Self::portrait(None)
    }
}

/// What the service hands back from a successful creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedBroadcast {
    pub broadcast_id: BroadcastId,
    pub upload_url: String,
}

/// Endpoint and secret an external encoder publishes to
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestCredentials {
    pub url: String,
    pub key: String,
}

impl IngestCredentials {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.url.is_empty() && !self.key.is_empty()
    }
}

// The stream key is a publishing secret; keep it out of logs.
impl std::fmt::Debug for IngestCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestCredentials")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// A viewer comment on a live broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub username: String,
    pub text: String,
    /// Unix timestamp in seconds
    pub created_at: i64,
}

impl Comment {
    #[must_use]
    pub fn created_at_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.created_at, 0)
    }
}
