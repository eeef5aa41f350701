pub mod controller;
pub mod failover;
pub mod queue;

pub use controller::{Collaborators, PlaybackController, SessionEvent, SessionStatus};
pub use failover::{FailoverPolicy, RetryState};
pub use queue::{SessionQueue, TrackRequest};
