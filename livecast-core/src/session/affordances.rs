use serde::Serialize;

use super::state::SessionState;

/// User-triggerable actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    GoLive,
    Stop,
    ToggleComments,
    Logout,
}

/// What the presentation layer may offer for the current session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Affordances {
    /// Progress indicator only; every action is disabled
    pub show_progress: bool,
    pub can_create: bool,
    pub can_logout: bool,
    pub can_go_live: bool,
    pub can_stop: bool,
    pub can_toggle_comments: bool,
    /// Ingest URL/key fields (read-only, copyable)
    pub show_credentials: bool,
}

impl Affordances {
    #[must_use]
    pub fn derive(state: &SessionState, is_loading: bool) -> Self {
        if is_loading {
            return Self {
                show_progress: true,
                ..Self::default()
            };
        }

        match state {
            SessionState::Idle => Self {
                can_create: true,
                can_logout: true,
                ..Self::default()
            },
            SessionState::ReadyToGoLive(_) => Self {
                can_go_live: true,
                show_credentials: true,
                ..Self::default()
            },
            SessionState::Live(_) => Self {
                can_stop: true,
                can_toggle_comments: true,
                show_credentials: true,
                ..Self::default()
            },
            // Transitional phases only exist while loading; offer nothing if seen otherwise.
            SessionState::Creating | SessionState::GoingLive(_) | SessionState::Stopping(_) => {
                Self {
                    show_progress: true,
                    ..Self::default()
                }
            }
        }
    }

    #[must_use]
    pub const fn allows(&self, action: Action) -> bool {
        match action {
            Action::Create => self.can_create,
            Action::GoLive => self.can_go_live,
            Action::Stop => self.can_stop,
            Action::ToggleComments => self.can_toggle_comments,
            Action::Logout => self.can_logout,
        }
    }

    /// Actions currently on offer, in display order
    #[must_use]
    pub fn available(&self) -> Vec<Action> {
        [
            Action::Create,
            Action::GoLive,
            Action::Stop,
            Action::ToggleComments,
            Action::Logout,
        ]
        .into_iter()
        .filter(|a| self.allows(*a))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BroadcastId, IngestCredentials};
    use crate::session::state::ActiveBroadcast;

    fn broadcast() -> ActiveBroadcast {
        ActiveBroadcast {
            id: BroadcastId::from("B1"),
            credentials: IngestCredentials::new("rtmp://ingest/", "B1"),
        }
    }

    #[test]
    fn test_loading_disables_everything() {
        for state in [
            SessionState::Idle,
            SessionState::ReadyToGoLive(broadcast()),
            SessionState::Live(broadcast()),
        ] {
            let a = Affordances::derive(&state, true);
            assert!(a.show_progress);
            assert!(a.available().is_empty());
            assert!(!a.show_credentials);
        }
    }

    #[test]
    fn test_idle_offers_create_and_logout() {
        let a = Affordances::derive(&SessionState::Idle, false);
        assert_eq!(a.available(), vec![Action::Create, Action::Logout]);
        assert!(!a.show_credentials);
    }

    #[test]
    fn test_ready_offers_go_live() {
        let a = Affordances::derive(&SessionState::ReadyToGoLive(broadcast()), false);
        assert_eq!(a.available(), vec![Action::GoLive]);
        assert!(a.show_credentials);
    }

    #[test]
    fn test_live_offers_stop_and_toggle() {
        let a = Affordances::derive(&SessionState::Live(broadcast()), false);
        assert_eq!(a.available(), vec![Action::Stop, Action::ToggleComments]);
        assert!(a.show_credentials);
        assert!(!a.show_progress);
    }

    #[test]
    fn test_transitional_state_without_loading_offers_nothing() {
        let a = Affordances::derive(&SessionState::Creating, false);
        assert!(a.show_progress);
        assert!(a.available().is_empty());
    }
}
