//! Pure transition function for broadcast sessions
//!
//! `next` never performs I/O. It returns the successor session plus the
//! comment-subsystem effects the caller must run, which keeps the whole
//! lifecycle testable without a runtime or a remote service.

use thiserror::Error;

use super::state::{ActiveBroadcast, BroadcastSession, Phase, SessionState};
use crate::models::BroadcastId;

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    CreateRequested,
    Created(ActiveBroadcast),
    CreateFailed,
    GoLiveRequested,
    WentLive,
    GoLiveFailed,
    StopRequested,
    Stopped,
    ToggleComments,
    LoggedOut,
}

impl SessionEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateRequested => "create_requested",
            Self::Created(_) => "created",
            Self::CreateFailed => "create_failed",
            Self::GoLiveRequested => "go_live_requested",
            Self::WentLive => "went_live",
            Self::GoLiveFailed => "go_live_failed",
            Self::StopRequested => "stop_requested",
            Self::Stopped => "stopped",
            Self::ToggleComments => "toggle_comments",
            Self::LoggedOut => "logged_out",
        }
    }
}

/// Side effects on the comment subsystem, in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Drop comments buffered from a previous broadcast
    ClearComments,
    ActivateComments(BroadcastId),
    DeactivateComments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Cannot apply {event} while {phase}")]
pub struct InvalidTransition {
    pub phase: Phase,
    pub event: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub session: BroadcastSession,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(state: SessionState, comments_visible: bool) -> Self {
        Self {
            session: BroadcastSession {
                state,
                comments_visible,
            },
            effects: Vec::new(),
        }
    }

    fn with(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Compute the successor of `session` under `event`.
pub fn next(
    session: &BroadcastSession,
    event: SessionEvent,
) -> Result<Transition, InvalidTransition> {
    let visible = session.comments_visible;

    let transition = match (&session.state, event) {
        (SessionState::Idle, SessionEvent::CreateRequested) => {
            Transition::to(SessionState::Creating, false)
        }
        (SessionState::Creating, SessionEvent::Created(broadcast)) => {
            Transition::to(SessionState::ReadyToGoLive(broadcast), false)
        }
        (SessionState::Creating, SessionEvent::CreateFailed) => {
            Transition::to(SessionState::Idle, false)
        }

        (SessionState::ReadyToGoLive(b), SessionEvent::GoLiveRequested) => {
            Transition::to(SessionState::GoingLive(b.clone()), false)
        }
        (SessionState::GoingLive(b), SessionEvent::WentLive) => {
            Transition::to(SessionState::Live(b.clone()), false)
                .with(Effect::ClearComments)
                .with(Effect::ActivateComments(b.id.clone()))
        }
        // Never reached Live, but the subsystem still gets its closing signal.
        (SessionState::GoingLive(_), SessionEvent::GoLiveFailed) => {
            Transition::to(SessionState::Idle, false).with(Effect::DeactivateComments)
        }

        // Polling stops as soon as Live is left, before the remote teardown runs.
        (SessionState::Live(b), SessionEvent::StopRequested) => {
            Transition::to(SessionState::Stopping(b.clone()), visible)
                .with(Effect::DeactivateComments)
        }
        (SessionState::Stopping(_), SessionEvent::Stopped) => {
            Transition::to(SessionState::Idle, false)
        }

        (SessionState::Live(b), SessionEvent::ToggleComments) => {
            Transition::to(SessionState::Live(b.clone()), !visible)
        }

        (SessionState::Live(_), SessionEvent::LoggedOut) => {
            Transition::to(SessionState::Idle, false).with(Effect::DeactivateComments)
        }
        (SessionState::Idle | SessionState::ReadyToGoLive(_), SessionEvent::LoggedOut) => {
            Transition::to(SessionState::Idle, false)
        }

        (state, event) => {
            return Err(InvalidTransition {
                phase: state.phase(),
                event: event.name(),
            })
        }
    };

    Ok(transition)
}
