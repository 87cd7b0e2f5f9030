//! # StudyQuest Core Library
//!
//! This library provides the core logic for the StudyQuest study timer:
//! a countdown session that may grant points at random while it runs, and
//! the per-user balance those points accumulate in. The CLI binary is a
//! thin host over the same library.
//!
//! ## Architecture
//!
//! - **Session Engine**: A tick-driven state machine; the caller invokes
//!   `tick()` once per second, or lets a [`SessionDriver`] do it on tokio
//! - **Ledger**: Point balances behind the [`PointsLedger`] trait, credited
//!   once per session by [`PointsReporter`]
//! - **Identity**: Local accounts, the signed-in user, and the admin role
//! - **Storage**: SQLite persistence and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: Countdown and reward-roll state machine
//! - [`SessionDriver`]: Cancellable real-time ticker
//! - [`Database`]: Accounts, balances and session history
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod identity;
pub mod ledger;
pub mod storage;
pub mod timer;

pub use error::{AuthError, ConfigError, CoreError, DatabaseError, LedgerError, SessionError, ValidationError};
pub use events::Event;
pub use identity::{Accounts, Identity, Registration, Role, UserId, UserRecord, UserSummary};
pub use ledger::{PointsLedger, PointsReporter, ReportStatus};
pub use storage::{Config, Database};
pub use timer::{
    RewardSource, SeededRewards, SessionConfig, SessionDriver, SessionEngine, SessionOutcome, TimerState,
};
