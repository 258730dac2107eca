//! End-to-end session lifecycle against an in-process streaming service

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use livecast_core::comments::CommentPoller;
use livecast_core::models::{BroadcastId, Comment, CreateBroadcastRequest, CreatedBroadcast};
use livecast_core::store::MemorySessionStore;
use livecast_core::{
    Action, CommentFeed, Phase, SessionController, SessionError, SessionNotice, StreamingClient,
    StreamingError, TeardownStep,
};

/// Fake service that records every call in order
#[derive(Default)]
struct FakeService {
    calls: Mutex<Vec<String>>,
    fail: Mutex<Vec<&'static str>>,
    create_gate: Option<Arc<Notify>>,
    comments: Mutex<Vec<Comment>>,
}

impl FakeService {
    fn failing(steps: &[&'static str]) -> Self {
        Self {
            fail: Mutex::new(steps.to_vec()),
            ..Self::default()
        }
    }

    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            create_gate: Some(gate),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.starts_with(name)).count()
    }

    fn record(&self, call: String, step: &'static str) -> Result<(), StreamingError> {
        self.calls.lock().push(call);
        if self.fail.lock().contains(&step) {
            Err(StreamingError::Network(format!("{step} unavailable")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StreamingClient for FakeService {
    async fn create_broadcast(
        &self,
        _request: &CreateBroadcastRequest,
    ) -> Result<CreatedBroadcast, StreamingError> {
        if let Some(gate) = &self.create_gate {
            gate.notified().await;
        }
        self.record("create".to_string(), "create")?;
        Ok(CreatedBroadcast {
            broadcast_id: BroadcastId::from("B1"),
            upload_url: "rtmp://ingest.example.com:80/rtmp/B1?s_sw=0&a=K1".to_string(),
        })
    }

    async fn start_broadcast(&self, broadcast_id: &BroadcastId) -> Result<(), StreamingError> {
        self.record(format!("start:{broadcast_id}"), "start")
    }

    async fn enable_comments(&self, broadcast_id: &BroadcastId) -> Result<(), StreamingError> {
        self.record(format!("enable_comments:{broadcast_id}"), "enable_comments")
    }

    async fn end_broadcast(&self, broadcast_id: &BroadcastId) -> Result<(), StreamingError> {
        self.record(format!("end:{broadcast_id}"), "end")
    }

    async fn archive_post_live(&self, broadcast_id: &BroadcastId) -> Result<(), StreamingError> {
        self.record(format!("archive:{broadcast_id}"), "archive")
    }

    async fn logout_account(&self) -> Result<(), StreamingError> {
        self.record("logout".to_string(), "logout")
    }
}

#[async_trait]
impl CommentFeed for FakeService {
    async fn fetch_comments(
        &self,
        broadcast_id: &BroadcastId,
        _since: Option<i64>,
    ) -> Result<Vec<Comment>, StreamingError> {
        self.calls.lock().push(format!("fetch:{broadcast_id}"));
        Ok(self.comments.lock().clone())
    }
}

struct Harness {
    service: Arc<FakeService>,
    poller: Arc<CommentPoller>,
    store: Arc<MemorySessionStore>,
    controller: SessionController,
}

fn harness(service: FakeService) -> Harness {
    let service = Arc::new(service);
    let poller = Arc::new(CommentPoller::new(service.clone(), Duration::from_secs(2), 50));
    let store = Arc::new(MemorySessionStore::new("session-token"));
    let controller = SessionController::new(
        service.clone(),
        poller.clone(),
        store.clone(),
        CreateBroadcastRequest::default(),
    );
    Harness {
        service,
        poller,
        store,
        controller,
    }
}

fn assert_invariants(h: &Harness) {
    let snapshot = h.controller.snapshot();
    let owns_broadcast = matches!(
        snapshot.phase,
        Phase::ReadyToGoLive | Phase::GoingLive | Phase::Live | Phase::Stopping
    );
    assert_eq!(snapshot.broadcast_id.is_some(), owns_broadcast);
    assert_eq!(snapshot.credentials.is_some(), owns_broadcast);
    assert_eq!(h.poller.is_active(), snapshot.phase == Phase::Live);
    assert!(!snapshot.is_loading);
}

#[tokio::test(start_paused = true)]
async fn test_create_derives_credentials() {
    let h = harness(FakeService::default());

    assert_eq!(h.controller.create().await.unwrap(), Phase::ReadyToGoLive);

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.broadcast_id, Some(BroadcastId::from("B1")));
    let creds = snapshot.credentials.clone().unwrap();
    assert_eq!(creds.url, "rtmp://ingest.example.com:80/rtmp/");
    assert_eq!(creds.key, "B1?s_sw=0&a=K1");
    assert_eq!(snapshot.affordances.available(), vec![Action::GoLive]);
    assert!(snapshot.affordances.show_credentials);
    assert_invariants(&h);
}

#[tokio::test(start_paused = true)]
async fn test_go_live_activates_comments_once() {
    let h = harness(FakeService::default());
    h.poller
        .buffer()
        .extend(vec![Comment {
            id: "stale".to_string(),
            username: "old".to_string(),
            text: "from a previous broadcast".to_string(),
            created_at: 1,
        }]);

    h.controller.create().await.unwrap();
    assert_eq!(h.controller.go_live().await.unwrap(), Phase::Live);

    assert_eq!(
        h.service.calls(),
        vec!["create", "start:B1", "enable_comments:B1"]
    );
    assert!(h.poller.buffer().is_empty());
    assert_eq!(h.poller.active_broadcast(), Some(BroadcastId::from("B1")));
    assert_invariants(&h);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(h.service.count("fetch:B1") >= 2);

    h.controller.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_start_rejection_reverts_to_idle() {
    let h = harness(FakeService::failing(&["start"]));

    h.controller.create().await.unwrap();
    let err = h.controller.go_live().await.unwrap_err();
    assert!(matches!(err, SessionError::GoLive(StreamingError::Network(_))));

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(snapshot.broadcast_id.is_none());
    assert!(snapshot.credentials.is_none());
    assert_eq!(h.service.count("enable_comments"), 0);
    assert!(h.poller.active_broadcast().is_none());
    assert_invariants(&h);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.service.count("fetch"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_with_rejected_end_still_tears_down() {
    let h = harness(FakeService::failing(&["end"]));
    let mut notices = h.controller.subscribe();

    h.controller.create().await.unwrap();
    h.controller.go_live().await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(h.poller.is_active());

    assert_eq!(h.controller.stop().await.unwrap(), Phase::Idle);
    assert!(!h.poller.is_active());
    assert_eq!(h.service.count("end:B1"), 1);
    assert_eq!(h.service.count("archive:B1"), 1);
    assert_invariants(&h);

    // No more polling once the broadcast is torn down
    let fetches = h.service.count("fetch");
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.service.count("fetch"), fetches);

    let mut failed_steps = Vec::new();
    while let Ok(notice) = notices.try_recv() {
        if let SessionNotice::TeardownFailed { step, broadcast_id, .. } = notice {
            assert_eq!(broadcast_id, BroadcastId::from("B1"));
            failed_steps.push(step);
        }
    }
    assert_eq!(failed_steps, vec![TeardownStep::EndBroadcast]);
}

#[tokio::test(start_paused = true)]
async fn test_second_create_while_pending_is_rejected() {
    let gate = Arc::new(Notify::new());
    let h = harness(FakeService::gated(gate.clone()));

    let (first, second) = tokio::join!(h.controller.create(), async {
        assert!(h.controller.is_loading());
        assert!(h.controller.snapshot().affordances.show_progress);
        assert!(matches!(h.controller.toggle_comments(), Err(SessionError::Busy)));
        let second = h.controller.create().await;
        gate.notify_one();
        second
    });

    assert_eq!(first.unwrap(), Phase::ReadyToGoLive);
    assert!(matches!(second, Err(SessionError::Busy)));
    assert_eq!(h.service.count("create"), 1);
    assert_invariants(&h);
}

#[tokio::test(start_paused = true)]
async fn test_create_abandoned_by_timeout_reverts_to_idle() {
    let gate = Arc::new(Notify::new());
    let h = harness(FakeService::gated(gate.clone()));

    let abandoned = tokio::time::timeout(Duration::from_secs(1), h.controller.create()).await;
    assert!(abandoned.is_err());

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.phase, Phase::Idle);
    assert_eq!(snapshot.affordances.available(), vec![Action::Create, Action::Logout]);
    assert_invariants(&h);

    gate.notify_one();
    assert_eq!(h.controller.create().await.unwrap(), Phase::ReadyToGoLive);
    assert_invariants(&h);
}

#[tokio::test(start_paused = true)]
async fn test_enable_comments_failure_ends_remote_broadcast() {
    let h = harness(FakeService::failing(&["enable_comments"]));

    h.controller.create().await.unwrap();
    assert!(h.controller.go_live().await.is_err());

    assert_eq!(
        h.service.calls(),
        vec!["create", "start:B1", "enable_comments:B1", "end:B1"]
    );
    assert_invariants(&h);
}

#[tokio::test(start_paused = true)]
async fn test_logout_from_live_clears_everything() {
    let h = harness(FakeService::failing(&["logout"]));
    let mut notices = h.controller.subscribe();

    h.controller.create().await.unwrap();
    h.controller.go_live().await.unwrap();
    assert!(h.controller.toggle_comments().unwrap());

    assert_eq!(h.controller.logout().await.unwrap(), Phase::Idle);
    assert!(h.store.token().is_none());
    assert!(!h.controller.snapshot().comments_visible);
    assert_invariants(&h);

    let logout_failed = std::iter::from_fn(|| notices.try_recv().ok())
        .any(|n| matches!(n, SessionNotice::LogoutFailed { .. }));
    assert!(logout_failed);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_cycles() {
    let h = harness(FakeService::default());

    for _ in 0..3 {
        h.controller.create().await.unwrap();
        h.controller.go_live().await.unwrap();
        h.controller.stop().await.unwrap();
        assert_invariants(&h);
    }

    assert_eq!(h.service.count("start:B1"), 3);
    assert_eq!(h.service.count("archive:B1"), 3);
}
