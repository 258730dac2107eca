use serde::{Deserialize, Serialize};

use crate::models::{BroadcastId, IngestCredentials};

/// Externally visible phase of a broadcast session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Creating,
    ReadyToGoLive,
    GoingLive,
    Live,
    Stopping,
}

impl Phase {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Creating => "creating",
            Self::ReadyToGoLive => "ready_to_go_live",
            Self::GoingLive => "going_live",
            Self::Live => "live",
            Self::Stopping => "stopping",
        }
    }

    /// Phases that only exist while a transition's remote calls are outstanding
    #[must_use]
    pub const fn is_transitional(&self) -> bool {
        matches!(self, Self::Creating | Self::GoingLive | Self::Stopping)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A created broadcast: id and ingest credentials always travel together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveBroadcast {
    pub id: BroadcastId,
    pub credentials: IngestCredentials,
}

/// Session state machine value
///
/// Every phase that owns a broadcast carries it, so a broadcast id without
/// credentials (or an id in `Idle`) cannot be represented.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Creating,
    ReadyToGoLive(ActiveBroadcast),
    GoingLive(ActiveBroadcast),
    Live(ActiveBroadcast),
    Stopping(ActiveBroadcast),
}

impl SessionState {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::Creating => Phase::Creating,
            Self::ReadyToGoLive(_) => Phase::ReadyToGoLive,
            Self::GoingLive(_) => Phase::GoingLive,
            Self::Live(_) => Phase::Live,
            Self::Stopping(_) => Phase::Stopping,
        }
    }

    #[must_use]
    pub const fn broadcast(&self) -> Option<&ActiveBroadcast> {
        match self {
            Self::Idle | Self::Creating => None,
            Self::ReadyToGoLive(b) | Self::GoingLive(b) | Self::Live(b) | Self::Stopping(b) => {
                Some(b)
            }
        }
    }

    #[must_use]
    pub fn broadcast_id(&self) -> Option<&BroadcastId> {
        self.broadcast().map(|b| &b.id)
    }

    #[must_use]
    pub fn credentials(&self) -> Option<&IngestCredentials> {
        self.broadcast().map(|b| &b.credentials)
    }
}

/// The single stateful entity owned by a controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastSession {
    pub(crate) state: SessionState,
    /// Comment overlay toggle. UI-only, reset on teardown.
    pub(crate) comments_visible: bool,
}

impl BroadcastSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.state.phase()
    }

    #[must_use]
    pub const fn comments_visible(&self) -> bool {
        self.comments_visible
    }
}
