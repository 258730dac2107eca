//! Live streaming service client

pub mod client;
pub mod types;

pub use client::LiveClient;
