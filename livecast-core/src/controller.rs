//! Broadcast session controller
//!
//! Effect-execution layer over [`crate::session::machine`]. Each public
//! transition runs its remote calls strictly in order, feeds the outcome
//! back into the pure state machine and executes the resulting comment
//! effects.
//!
//! Concurrency contract:
//! - One transition at a time. The busy flag is taken before the first
//!   remote call and released by a guard on every exit path; a trigger
//!   while busy returns [`SessionError::Busy`] without side effects.
//! - The session lock is never held across an `.await`.
//! - A transition future dropped mid-flight reverts the session to Idle
//!   through [`Rollback`]. Remote calls it had already issued are not undone.
//!
//! Failure policy:
//! - create/go-live failures revert to Idle and are returned to the caller.
//! - stop and logout are best-effort: local state always resets, remote
//!   failures are published on the notice channel instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::client::{StreamingClient, StreamingError};
use crate::comments::CommentSubsystem;
use crate::models::{BroadcastId, CreateBroadcastRequest, IngestCredentials};
use crate::session::{
    machine, ActiveBroadcast, Affordances, BroadcastSession, Effect, InvalidTransition, Phase,
    SessionEvent, SessionState,
};
use crate::store::SessionStore;

const NOTICE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Another session operation is in progress")]
    Busy,

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Failed to create broadcast: {0}")]
    Create(#[source] StreamingError),

    #[error("Failed to go live: {0}")]
    GoLive(#[source] StreamingError),
}

/// Remote step of a best-effort teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownStep {
    EndBroadcast,
    ArchivePostLive,
    /// Ending a broadcast that was started but never reached Live
    EndOrphanedBroadcast,
}

/// Non-blocking notifications for the presentation layer
#[derive(Debug, Clone)]
pub enum SessionNotice {
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    TeardownFailed {
        step: TeardownStep,
        broadcast_id: BroadcastId,
        error: StreamingError,
    },
    LogoutFailed {
        reason: String,
    },
}

/// Everything the presentation layer renders from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub broadcast_id: Option<BroadcastId>,
    pub credentials: Option<IngestCredentials>,
    pub comments_visible: bool,
    pub is_loading: bool,
    pub affordances: Affordances,
}

/// Clears the busy flag when the transition scope ends, however it ends
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Reverts a transitional phase if the owning future is dropped before
/// the transition settles
struct Rollback<'a> {
    controller: &'a SessionController,
    pending: Option<SessionEvent>,
}

impl<'a> Rollback<'a> {
    fn arm(controller: &'a SessionController, on_abandon: SessionEvent) -> Self {
        Self {
            controller,
            pending: Some(on_abandon),
        }
    }

    fn settle(mut self, event: SessionEvent) -> Result<BroadcastSession, InvalidTransition> {
        self.pending = None;
        self.controller.apply(event)
    }
}

impl Drop for Rollback<'_> {
    fn drop(&mut self) {
        let Some(event) = self.pending.take() else {
            return;
        };
        warn!(
            phase = %self.controller.phase(),
            event = event.name(),
            "Transition abandoned before completion, reverting"
        );
        if let Err(e) = self.controller.apply(event) {
            warn!(error = %e, "Rollback rejected");
        }
    }
}

/// Drives a single broadcast session
pub struct SessionController {
    client: Arc<dyn StreamingClient>,
    comments: Arc<dyn CommentSubsystem>,
    store: Arc<dyn SessionStore>,
    request: CreateBroadcastRequest,
    session: Mutex<BroadcastSession>,
    busy: AtomicBool,
    notices: broadcast::Sender<SessionNotice>,
}

impl SessionController {
    pub fn new(
        client: Arc<dyn StreamingClient>,
        comments: Arc<dyn CommentSubsystem>,
        store: Arc<dyn SessionStore>,
        request: CreateBroadcastRequest,
    ) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self {
            client,
            comments,
            store,
            request,
            session: Mutex::new(BroadcastSession::new()),
            busy: AtomicBool::new(false),
            notices,
        }
    }

    // ========== Queries ==========

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.session.lock().phase()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.lock().clone();
        let is_loading = self.is_loading();
        let state = session.state();

        SessionSnapshot {
            phase: state.phase(),
            broadcast_id: state.broadcast_id().cloned(),
            credentials: state.credentials().cloned(),
            comments_visible: session.comments_visible(),
            is_loading,
            affordances: Affordances::derive(state, is_loading),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    // ========== Transitions ==========

    /// Idle → ReadyToGoLive
    #[instrument(skip(self))]
    pub async fn create(&self) -> Result<Phase, SessionError> {
        let _busy = self.begin()?;
        self.apply(SessionEvent::CreateRequested)?;
        let rollback = Rollback::arm(self, SessionEvent::CreateFailed);

        match self.create_broadcast().await {
            Ok(broadcast) => {
                info!(broadcast_id = %broadcast.id, "Broadcast created");
                Ok(rollback.settle(SessionEvent::Created(broadcast))?.phase())
            }
            Err(e) => {
                warn!(error = %e, "Broadcast creation failed");
                rollback.settle(SessionEvent::CreateFailed)?;
                Err(SessionError::Create(e))
            }
        }
    }

    /// ReadyToGoLive → Live
    #[instrument(skip(self))]
    pub async fn go_live(&self) -> Result<Phase, SessionError> {
        let _busy = self.begin()?;
        let id = match self.apply(SessionEvent::GoLiveRequested)?.state() {
            SessionState::GoingLive(broadcast) => broadcast.id.clone(),
            other => return Err(unexpected(other.phase(), "go_live")),
        };
        let rollback = Rollback::arm(self, SessionEvent::GoLiveFailed);

        if let Err(e) = self.client.start_broadcast(&id).await {
            warn!(broadcast_id = %id, error = %e, "Starting broadcast failed");
            rollback.settle(SessionEvent::GoLiveFailed)?;
            return Err(SessionError::GoLive(e));
        }
        debug!(broadcast_id = %id, "Broadcast started");

        if let Err(e) = self.client.enable_comments(&id).await {
            warn!(broadcast_id = %id, error = %e, "Enabling comments failed after start");
            // The remote broadcast is running and about to lose its only local reference.
            self.end_orphaned(&id).await;
            rollback.settle(SessionEvent::GoLiveFailed)?;
            return Err(SessionError::GoLive(e));
        }

        let phase = rollback.settle(SessionEvent::WentLive)?.phase();
        info!(broadcast_id = %id, "Broadcast is live");
        Ok(phase)
    }

    /// Live → Idle. Always ends in Idle; remote failures become notices.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<Phase, SessionError> {
        let _busy = self.begin()?;
        let id = match self.apply(SessionEvent::StopRequested)?.state() {
            SessionState::Stopping(broadcast) => broadcast.id.clone(),
            other => return Err(unexpected(other.phase(), "stop")),
        };
        let rollback = Rollback::arm(self, SessionEvent::Stopped);

        if let Err(e) = self.client.end_broadcast(&id).await {
            self.report_teardown(TeardownStep::EndBroadcast, &id, e);
        }
        if let Err(e) = self.client.archive_post_live(&id).await {
            self.report_teardown(TeardownStep::ArchivePostLive, &id, e);
        }

        let phase = rollback.settle(SessionEvent::Stopped)?.phase();
        info!(broadcast_id = %id, "Broadcast stopped");
        Ok(phase)
    }

    /// Invalidate the local session, then ask the service to log out.
    ///
    /// Local invalidation is the operative guarantee; the remote call is
    /// fire-and-forget and its failure only produces a notice.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<Phase, SessionError> {
        let _busy = self.begin()?;
        let phase = self.apply(SessionEvent::LoggedOut)?.phase();

        if let Err(e) = self.store.remove_session() {
            warn!(error = %e, "Failed to remove stored session");
            self.notify(SessionNotice::LogoutFailed {
                reason: e.to_string(),
            });
        }

        if let Err(e) = self.client.logout_account().await {
            warn!(error = %e, "Remote logout failed");
            self.notify(SessionNotice::LogoutFailed {
                reason: e.to_string(),
            });
        }

        info!("Logged out");
        Ok(phase)
    }

    /// Flip the comment overlay. Only meaningful while Live.
    pub fn toggle_comments(&self) -> Result<bool, SessionError> {
        if self.is_loading() {
            return Err(SessionError::Busy);
        }
        Ok(self
            .apply(SessionEvent::ToggleComments)?
            .comments_visible())
    }

    /// Leave no broadcast running and no timer behind
    pub async fn shutdown(&self) {
        if self.phase() != Phase::Live {
            return;
        }
        if let Err(e) = self.stop().await {
            warn!(error = %e, "Could not stop broadcast during shutdown");
        }
    }

    // ========== Internals ==========

    fn begin(&self) -> Result<BusyGuard<'_>, SessionError> {
        BusyGuard::acquire(&self.busy).ok_or_else(|| {
            debug!("Rejected trigger while busy");
            SessionError::Busy
        })
    }

    async fn create_broadcast(&self) -> Result<ActiveBroadcast, StreamingError> {
        let created = self.client.create_broadcast(&self.request).await?;
        let credentials = self.client.derive_ingest_credentials(&created)?;

        if !credentials.is_complete() {
            return Err(StreamingError::InvalidResponse(format!(
                "Empty ingest credentials for broadcast {}",
                created.broadcast_id
            )));
        }

        Ok(ActiveBroadcast {
            id: created.broadcast_id,
            credentials,
        })
    }

    async fn end_orphaned(&self, id: &BroadcastId) {
        match self.client.end_broadcast(id).await {
            Ok(()) => info!(broadcast_id = %id, "Ended orphaned broadcast"),
            Err(e) => self.report_teardown(TeardownStep::EndOrphanedBroadcast, id, e),
        }
    }

    /// Run one event through the state machine and execute its effects.
    /// Returns the new session.
    fn apply(&self, event: SessionEvent) -> Result<BroadcastSession, InvalidTransition> {
        let (from, next) = {
            let mut session = self.session.lock();
            let from = session.phase();
            let transition = machine::next(&session, event)?;
            *session = transition.session.clone();
            (from, transition)
        };

        for effect in &next.effects {
            self.run_effect(effect);
        }

        let to = next.session.phase();
        if from != to {
            debug!(%from, %to, "Session phase changed");
            self.notify(SessionNotice::PhaseChanged { from, to });
        }

        Ok(next.session)
    }

    fn run_effect(&self, effect: &Effect) {
        match effect {
            Effect::ClearComments => self.comments.clear(),
            Effect::ActivateComments(id) => self.comments.activate(id),
            Effect::DeactivateComments => self.comments.deactivate(),
        }
    }

    fn report_teardown(&self, step: TeardownStep, id: &BroadcastId, error: StreamingError) {
        warn!(broadcast_id = %id, ?step, error = %error, "Teardown step failed, continuing");
        self.notify(SessionNotice::TeardownFailed {
            step,
            broadcast_id: id.clone(),
            error,
        });
    }

    fn notify(&self, notice: SessionNotice) {
        // Nobody listening is not an error.
        let _ = self.notices.send(notice);
    }
}

fn unexpected(phase: Phase, event: &'static str) -> SessionError {
    SessionError::InvalidTransition(InvalidTransition { phase, event })
}
