// Livecast Provider Clients
//
// HTTP implementations of the livecast-core service traits.
// `LiveClient` implements both `StreamingClient` and `CommentFeed`.

// Shared error types
pub mod error;

pub mod live;

pub use error::LiveApiError;
pub use live::LiveClient;
