use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;

use crate::models::Comment;

/// Bounded, de-duplicated store of received comments (oldest evicted first)
pub struct CommentBuffer {
    inner: Mutex<Inner>,
    capacity: usize,
}

#[derive(Default)]
struct Inner {
    comments: VecDeque<Comment>,
    seen: HashSet<String>,
}

impl CommentBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Append comments, skipping ids already held. Returns the ones actually added.
    pub fn extend(&self, comments: impl IntoIterator<Item = Comment>) -> Vec<Comment> {
        let mut inner = self.inner.lock();
        let mut added = Vec::new();

        for comment in comments {
            if !inner.seen.insert(comment.id.clone()) {
                continue;
            }
            inner.comments.push_back(comment.clone());
            added.push(comment);

            while inner.comments.len() > self.capacity {
                if let Some(evicted) = inner.comments.pop_front() {
                    inner.seen.remove(&evicted.id);
                }
            }
        }

        added
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Comment> {
        self.inner.lock().comments.iter().cloned().collect()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.comments.clear();
        inner.seen.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().comments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
