//! Local session storage
//!
//! How the session was written is up to the login flow; this side only
//! needs to invalidate it on logout.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::Result;

/// Locally persisted authentication state
pub trait SessionStore: Send + Sync {
    /// Invalidate the stored session. Removing an absent session succeeds.
    fn remove_session(&self) -> Result<()>;
}

/// Session persisted as a single file
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn remove_session(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Removed stored session");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored session to remove");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process session holder
#[derive(Default)]
pub struct MemorySessionStore {
    token: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.lock().clone()
    }
}

impl SessionStore for MemorySessionStore {
    fn remove_session(&self) -> Result<()> {
        self.token.lock().take();
        Ok(())
    }
}
