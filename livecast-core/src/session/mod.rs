// Broadcast Session
//
// State value, pure transition function and derived UI affordances.
// The controller in `crate::controller` is the only writer.

pub mod affordances;
pub mod machine;
pub mod state;

pub use affordances::{Action, Affordances};
pub use machine::{next, Effect, InvalidTransition, SessionEvent, Transition};
pub use state::{ActiveBroadcast, BroadcastSession, Phase, SessionState};
