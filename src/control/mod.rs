mod driver;
mod errors;
mod pacing;
mod session;

pub use driver::{ControlLoopDriver, EpisodeState, RolloutSummary};
pub use errors::ControlError;
pub use pacing::pacing_delay;
pub use session::{EvalSession, SessionReport};
