//! Poll lifecycle engine
//!
//! A poll moves through: created (on command) -> persisted -> monitored ->
//! resolved (vote closed, tally computed, action applied) -> deleted.
//! Exactly one live timer exists per un-resolved poll; a poll stays in the
//! store from the moment it is saved until its resolution completes.

mod applier;
mod error;
mod monitor;
mod record;
mod resolver;
mod store;

pub use applier::ActionApplier;
pub use error::{PollError, PollResult};
pub use monitor::PollMonitor;
pub use record::{
    clamp_duration, generate_poll_id, max_duration, min_duration, ModAction, Permission, Poll,
    PollType, MAX_DURATION_SECS, MIN_DURATION_SECS,
};
pub use resolver::PollResolver;
pub use store::FilePollStore;
