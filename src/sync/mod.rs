pub mod clock;
pub mod control;
pub mod easing;
pub mod hooks;
pub mod poller;
pub mod runner;
pub mod session;
pub mod volume;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::MonotonicTime;
pub use control::Controller;
pub use hooks::Hooks;
pub use poller::{PollSchedule, Syncer};
pub use runner::Runner;
pub use session::Session;
