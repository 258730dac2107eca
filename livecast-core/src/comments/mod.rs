//! Comment subsystem
//!
//! The controller never polls comments itself. It only owns the activation
//! signal: `activate` once on entering Live, `deactivate` once on leaving it.
//! [`CommentPoller`] is the polling implementation.

pub mod buffer;
pub mod poller;

pub use buffer::CommentBuffer;
pub use poller::CommentPoller;

use crate::models::BroadcastId;

/// Receiver of the controller's activation signal
pub trait CommentSubsystem: Send + Sync {
    /// Start delivering comments for `broadcast_id`
    fn activate(&self, broadcast_id: &BroadcastId);

    /// Stop all polling. Must cancel any outstanding timer before returning.
    fn deactivate(&self);

    /// Drop buffered comments
    fn clear(&self);
}
