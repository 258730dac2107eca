//! Test helpers and fixtures for livecast-core tests

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::comments::CommentSubsystem;
use crate::models::{BroadcastId, Comment, CreatedBroadcast};

/// Create a test comment
pub fn comment(id: &str, created_at: i64) -> Comment {
    Comment {
        id: id.to_string(),
        username: "viewer".to_string(),
        text: format!("comment {id}"),
        created_at,
    }
}

/// Creation response whose upload URL embeds the id the way the service does
pub fn created_broadcast(id: &str) -> CreatedBroadcast {
    CreatedBroadcast {
        broadcast_id: BroadcastId::from(id),
        upload_url: format!("rtmps://live-upload.example.com:443/rtmp/{id}?s_sw=0&a=K1"),
    }
}

/// Comment subsystem that only records the signals it receives
#[derive(Default)]
pub struct RecordingComments {
    activations: AtomicUsize,
    deactivations: AtomicUsize,
    clears: AtomicUsize,
    active: Mutex<Option<BroadcastId>>,
    last_activated: Mutex<Option<BroadcastId>>,
}

impl RecordingComments {
    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn deactivations(&self) -> usize {
        self.deactivations.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn last_activated(&self) -> Option<BroadcastId> {
        self.last_activated.lock().clone()
    }
}

impl CommentSubsystem for RecordingComments {
    fn activate(&self, broadcast_id: &BroadcastId) {
        self.activations.fetch_add(1, Ordering::SeqCst);
        *self.active.lock() = Some(broadcast_id.clone());
        *self.last_activated.lock() = Some(broadcast_id.clone());
    }

    fn deactivate(&self) {
        self.deactivations.fetch_add(1, Ordering::SeqCst);
        self.active.lock().take();
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}
