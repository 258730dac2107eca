pub mod client;
pub mod comments;
pub mod config;
pub mod controller;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod session;
pub mod store;

#[cfg(test)]
pub mod test_helpers;

pub use client::{CommentFeed, StreamingClient, StreamingError};
pub use config::Config;
pub use controller::{SessionController, SessionError, SessionNotice, SessionSnapshot, TeardownStep};
pub use error::{Error, Result};
pub use session::{Action, Affordances, Phase};
