use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use super::buffer::CommentBuffer;
use super::CommentSubsystem;
use crate::client::CommentFeed;
use crate::config::CommentsConfig;
use crate::models::{BroadcastId, Comment};

const COMMENT_CHANNEL_CAPACITY: usize = 256;

/// Polls a [`CommentFeed`] for the active broadcast.
///
/// The poller owns its timer task. At most one polling window exists; it is
/// closed by `deactivate()`, by a new `activate()`, or when the poller is
/// dropped. `activate()` spawns onto the current Tokio runtime.
pub struct CommentPoller {
    feed: Arc<dyn CommentFeed>,
    buffer: Arc<CommentBuffer>,
    interval: Duration,
    sender: broadcast::Sender<Comment>,
    window: Mutex<Option<PollWindow>>,
}

struct PollWindow {
    broadcast_id: BroadcastId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollWindow {
    fn close(self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

impl CommentPoller {
    pub fn new(feed: Arc<dyn CommentFeed>, interval: Duration, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(COMMENT_CHANNEL_CAPACITY);
        Self {
            feed,
            buffer: Arc::new(CommentBuffer::new(capacity)),
            interval,
            sender,
            window: Mutex::new(None),
        }
    }

    pub fn from_config(feed: Arc<dyn CommentFeed>, config: &CommentsConfig) -> Self {
        Self::new(feed, config.poll_interval(), config.buffer_capacity)
    }

    /// Comments received so far in the current (or last) window
    #[must_use]
    pub fn buffer(&self) -> Arc<CommentBuffer> {
        Arc::clone(&self.buffer)
    }

    /// Stream of newly received comments
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Comment> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.window.lock().is_some()
    }

    #[must_use]
    pub fn active_broadcast(&self) -> Option<BroadcastId> {
        self.window.lock().as_ref().map(|w| w.broadcast_id.clone())
    }

    async fn poll_loop(
        feed: Arc<dyn CommentFeed>,
        buffer: Arc<CommentBuffer>,
        sender: broadcast::Sender<Comment>,
        broadcast_id: BroadcastId,
        period: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cursor: Option<i64> = None;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = feed.fetch_comments(&broadcast_id, cursor) => result,
            };

            match result {
                Ok(comments) => {
                    if let Some(newest) = comments.iter().map(|c| c.created_at).max() {
                        cursor = Some(cursor.map_or(newest, |c| c.max(newest)));
                    }
                    let added = buffer.extend(comments);
                    if !added.is_empty() {
                        debug!(count = added.len(), "Received comments");
                    }
                    for comment in added {
                        // No subscribers is fine; the buffer still holds it.
                        let _ = sender.send(comment);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Comment poll failed, retrying next tick");
                }
            }
        }

        debug!("Comment polling stopped");
    }
}

impl CommentSubsystem for CommentPoller {
    fn activate(&self, broadcast_id: &BroadcastId) {
        let mut window = self.window.lock();
        if let Some(previous) = window.take() {
            warn!(
                previous = %previous.broadcast_id,
                "Comment polling already active, replacing window"
            );
            previous.close();
        }

        let cancel = CancellationToken::new();
        let span = tracing::info_span!("comment_poll", broadcast_id = %broadcast_id);
        let task = tokio::spawn(
            Self::poll_loop(
                Arc::clone(&self.feed),
                Arc::clone(&self.buffer),
                self.sender.clone(),
                broadcast_id.clone(),
                self.interval,
                cancel.clone(),
            )
            .instrument(span),
        );

        info!(broadcast_id = %broadcast_id, interval = ?self.interval, "Comment polling activated");
        *window = Some(PollWindow {
            broadcast_id: broadcast_id.clone(),
            cancel,
            task,
        });
    }

    fn deactivate(&self) {
        if let Some(window) = self.window.lock().take() {
            info!(broadcast_id = %window.broadcast_id, "Comment polling deactivated");
            window.close();
        }
    }

    fn clear(&self) {
        self.buffer.clear();
    }
}

impl Drop for CommentPoller {
    fn drop(&mut self) {
        if let Some(window) = self.window.get_mut().take() {
            window.close();
        }
    }
}
