use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerState;

/// Every state change of a session produces an Event.
/// The host prints or forwards them; the engine never inspects them again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: u64,
        duration_secs: u64,
        reward_interval_secs: u64,
        at: DateTime<Utc>,
    },
    /// A reward roll was evaluated at `elapsed_secs`.
    RewardRolled {
        session_id: u64,
        elapsed_secs: u64,
        granted: bool,
        accrued_points: u64,
        at: DateTime<Utc>,
    },
    /// The session ended, either at zero or by an early stop.
    SessionCompleted {
        session_id: u64,
        accrued_points: u64,
        elapsed_secs: u64,
        cancelled: bool,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        session_id: u64,
        remaining_secs: u64,
        elapsed_secs: u64,
        accrued_points: u64,
        clock: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Session the event belongs to.
    pub fn session_id(&self) -> u64 {
        match self {
            Event::SessionStarted { session_id, .. }
            | Event::RewardRolled { session_id, .. }
            | Event::SessionCompleted { session_id, .. }
            | Event::StateSnapshot { session_id, .. } => *session_id,
        }
    }

    pub fn is_completion(&self) -> bool {
        matches!(self, Event::SessionCompleted { .. })
    }
}
