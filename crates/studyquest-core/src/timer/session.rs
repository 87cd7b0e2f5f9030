use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Parameters of one countdown session, fixed at start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Countdown length in whole seconds.
    pub duration_secs: u64,
    /// A reward roll is attempted every time elapsed time hits a multiple of this.
    pub reward_interval_secs: u64,
    /// Points granted per successful roll.
    pub reward_amount: u64,
    /// Chance in `[0, 1]` that a single roll succeeds.
    pub reward_probability: f64,
}

impl SessionConfig {
    /// Reject configurations that would schedule a degenerate countdown.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.duration_secs == 0 {
            return Err(ValidationError::NotPositive {
                field: "duration_secs",
            });
        }
        if self.reward_interval_secs == 0 {
            return Err(ValidationError::NotPositive {
                field: "reward_interval_secs",
            });
        }
        if self.reward_amount == 0 {
            return Err(ValidationError::NotPositive {
                field: "reward_amount",
            });
        }
        if !self.reward_probability.is_finite() || !(0.0..=1.0).contains(&self.reward_probability)
        {
            return Err(ValidationError::ProbabilityOutOfRange {
                field: "reward_probability",
                value: self.reward_probability,
            });
        }
        Ok(())
    }

    /// Number of rolls a full session attempts.
    pub fn eligible_rolls(&self) -> u64 {
        if self.reward_interval_secs == 0 {
            return 0;
        }
        self.duration_secs / self.reward_interval_secs
    }

    /// Expected points for an uninterrupted session.
    pub fn expected_points(&self) -> f64 {
        self.eligible_rolls() as f64 * self.reward_amount as f64 * self.reward_probability
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: 20,
            reward_interval_secs: 3,
            reward_amount: 1,
            reward_probability: 0.5,
        }
    }
}

/// Mutable per-session state. Only the engine writes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub remaining_secs: u64,
    pub accrued_points: u64,
    /// Elapsed value at which the last roll was evaluated.
    pub last_reward_tick: u64,
    pub running: bool,
}

/// What a finished session reports to its host, exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub session_id: u64,
    pub accrued_points: u64,
    pub elapsed_secs: u64,
    pub duration_secs: u64,
    /// True when the session ended before reaching zero.
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Render seconds as a zero-padded `mm:ss` clock.
///
/// Minutes are not wrapped into hours, so 3725 seconds is `62:05`.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
