mod driver;
mod engine;
mod reward;
mod session;

pub use driver::{SessionDriver, TICK_PERIOD};
pub use engine::{SessionEngine, TimerState};
pub use reward::{RewardSource, SeededRewards};
pub use session::{format_clock, SessionConfig, SessionOutcome, SessionState};
