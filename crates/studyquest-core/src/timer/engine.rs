//! Session engine implementation.
//!
//! The engine is a tick-driven state machine. It does not own a clock or a
//! thread - the caller (usually [`super::SessionDriver`]) invokes `tick()`
//! once per second while a session runs.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Completed -> Running -> ...
//! ```
//!
//! `stop()` is an early completion, not a pause.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::new(SeededRewards::from_seed(1))
//!     .on_complete(|outcome| println!("earned {}", outcome.accrued_points));
//! engine.start(SessionConfig::default())?;
//! while engine.is_running() {
//!     engine.tick();
//! }
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::reward::{RewardSource, SeededRewards};
use super::session::{format_clock, SessionConfig, SessionOutcome, SessionState};
use crate::error::SessionError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Completed,
}

type CompletionHandler = Box<dyn FnMut(&SessionOutcome) + Send>;

/// Core session engine.
///
/// Holds at most one session at a time. Every started session reports its
/// [`SessionOutcome`] to the completion handler exactly once: on the final
/// tick, on `stop()`, when replaced by another `start()`, or on drop.
pub struct SessionEngine {
    state: TimerState,
    session: SessionState,
    /// Config of the current session, or of the last one once it ended.
    config: Option<SessionConfig>,
    session_id: u64,
    started_at: Option<DateTime<Utc>>,
    rewards: Box<dyn RewardSource>,
    on_complete: Option<CompletionHandler>,
}

impl SessionEngine {
    /// Create an idle engine drawing rolls from `rewards`.
    pub fn new(rewards: impl RewardSource + 'static) -> Self {
        Self {
            state: TimerState::Idle,
            session: SessionState::default(),
            config: None,
            session_id: 0,
            started_at: None,
            rewards: Box::new(rewards),
            on_complete: None,
        }
    }

    /// Engine backed by [`SeededRewards`].
    pub fn seeded(seed: Option<u64>) -> Self {
        Self::new(SeededRewards::new(seed))
    }

    /// Builder form of [`Self::set_completion_handler`].
    pub fn on_complete<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&SessionOutcome) + Send + 'static,
    {
        self.set_completion_handler(handler);
        self
    }

    pub fn set_completion_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&SessionOutcome) + Send + 'static,
    {
        self.on_complete = Some(Box::new(handler));
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.session.running
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn remaining_secs(&self) -> u64 {
        self.session.remaining_secs
    }

    pub fn accrued_points(&self) -> u64 {
        self.session.accrued_points
    }

    pub fn session_state(&self) -> &SessionState {
        &self.session
    }

    /// Config of the running session. `None` when not running.
    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref().filter(|_| self.session.running)
    }

    /// Last config handed to `start`, used by `toggle`.
    pub fn last_config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    /// Whole seconds elapsed in the current (or last) session.
    pub fn elapsed_secs(&self) -> u64 {
        match (&self.config, self.state) {
            (Some(cfg), TimerState::Running | TimerState::Completed) => {
                cfg.duration_secs.saturating_sub(self.session.remaining_secs)
            }
            _ => 0,
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.state,
            session_id: self.session_id,
            remaining_secs: self.session.remaining_secs,
            elapsed_secs: self.elapsed_secs(),
            accrued_points: self.session.accrued_points,
            clock: format_clock(self.session.remaining_secs),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a new session. A running session is stopped (and reported) first.
    pub fn start(&mut self, config: SessionConfig) -> Result<Event, SessionError> {
        config.validate()?;
        if self.session.running {
            self.stop();
        }

        self.session_id += 1;
        self.session = SessionState {
            remaining_secs: config.duration_secs,
            accrued_points: 0,
            last_reward_tick: 0,
            running: true,
        };
        self.state = TimerState::Running;
        let at = Utc::now();
        self.started_at = Some(at);

        info!(
            session_id = self.session_id,
            duration_secs = config.duration_secs,
            reward_interval_secs = config.reward_interval_secs,
            "session started"
        );
        let event = Event::SessionStarted {
            session_id: self.session_id,
            duration_secs: config.duration_secs,
            reward_interval_secs: config.reward_interval_secs,
            at,
        };
        self.config = Some(config);
        Ok(event)
    }

    /// End the running session early. No-op when nothing is running.
    pub fn stop(&mut self) -> Option<Event> {
        if !self.session.running {
            return None;
        }
        Some(self.finish(true))
    }

    /// Stop when running, otherwise restart with the last known config.
    pub fn toggle(&mut self) -> Result<Option<Event>, SessionError> {
        if self.session.running {
            return Ok(self.stop());
        }
        let config = self
            .config
            .clone()
            .ok_or(SessionError::NoPreviousConfig)?;
        self.start(config).map(Some)
    }

    /// Advance the countdown by one second.
    ///
    /// Returns the roll evaluated at the new elapsed value (if any) followed
    /// by the completion event when the countdown reached zero.
    pub fn tick(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if !self.session.running {
            return events;
        }
        let Some(config) = self.config.as_ref() else {
            return events;
        };
        let (duration, interval, amount, probability) = (
            config.duration_secs,
            config.reward_interval_secs,
            config.reward_amount,
            config.reward_probability,
        );

        self.session.remaining_secs = self.session.remaining_secs.saturating_sub(1);
        let elapsed = duration - self.session.remaining_secs;

        if let Some(event) = self.roll(elapsed, interval, amount, probability) {
            events.push(event);
        }
        if self.session.remaining_secs == 0 {
            events.push(self.finish(false));
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn roll(&mut self, elapsed: u64, interval: u64, amount: u64, probability: f64) -> Option<Event> {
        if elapsed == 0 || elapsed % interval != 0 || elapsed == self.session.last_reward_tick {
            return None;
        }
        self.session.last_reward_tick = elapsed;

        let granted = self.rewards.draw() < probability;
        if granted {
            self.session.accrued_points = self.session.accrued_points.saturating_add(amount);
        }
        debug!(
            session_id = self.session_id,
            elapsed,
            granted,
            accrued = self.session.accrued_points,
            "reward roll"
        );
        Some(Event::RewardRolled {
            session_id: self.session_id,
            elapsed_secs: elapsed,
            granted,
            accrued_points: self.session.accrued_points,
            at: Utc::now(),
        })
    }

    fn finish(&mut self, cancelled: bool) -> Event {
        self.session.running = false;
        self.state = TimerState::Completed;

        let ended_at = Utc::now();
        let outcome = SessionOutcome {
            session_id: self.session_id,
            accrued_points: self.session.accrued_points,
            elapsed_secs: self.elapsed_secs(),
            duration_secs: self.config.as_ref().map(|c| c.duration_secs).unwrap_or(0),
            cancelled,
            started_at: self.started_at.unwrap_or(ended_at),
            ended_at,
        };
        info!(
            session_id = outcome.session_id,
            accrued_points = outcome.accrued_points,
            elapsed_secs = outcome.elapsed_secs,
            cancelled,
            "session finished"
        );
        if let Some(handler) = self.on_complete.as_mut() {
            handler(&outcome);
        }

        Event::SessionCompleted {
            session_id: outcome.session_id,
            accrued_points: outcome.accrued_points,
            elapsed_secs: outcome.elapsed_secs,
            cancelled,
            at: ended_at,
        }
    }
}

impl fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEngine")
            .field("state", &self.state)
            .field("session", &self.session)
            .field("config", &self.config)
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl Drop for SessionEngine {
    fn drop(&mut self) {
        // Flush whatever was accrued so the host can still credit it.
        if self.session.running {
            self.finish(true);
        }
    }
}
