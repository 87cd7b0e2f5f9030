//! Real-time ticking for a [`SessionEngine`].
//!
//! One tokio task per session calls `tick()` once per period. Replacing or
//! stopping a session aborts that task before touching the engine, and the
//! task re-checks the session id under the lock, so a stale ticker never
//! advances a newer session.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use super::engine::SessionEngine;
use super::session::SessionConfig;
use crate::error::SessionError;
use crate::events::Event;

/// Default tick period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Owns an engine and at most one active ticker task.
pub struct SessionDriver {
    engine: Arc<Mutex<SessionEngine>>,
    period: Duration,
    ticker: Option<JoinHandle<()>>,
    events: mpsc::UnboundedSender<Event>,
}

impl SessionDriver {
    /// Wrap `engine`. Every event it produces is sent on the returned receiver.
    pub fn new(engine: SessionEngine, period: Duration) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Self {
            engine: Arc::new(Mutex::new(engine)),
            period,
            ticker: None,
            events: tx,
        };
        (driver, rx)
    }

    /// Start a session and its ticker. Must be called inside a tokio runtime.
    pub fn start(&mut self, config: SessionConfig) -> Result<(), SessionError> {
        config.validate()?;
        self.cancel_ticker();

        let session_id = {
            let mut engine = self.lock();
            if let Some(event) = engine.stop() {
                let _ = self.events.send(event);
            }
            let started = engine.start(config)?;
            let _ = self.events.send(started);
            engine.session_id()
        };

        self.ticker = Some(tokio::spawn(run_ticker(
            Arc::clone(&self.engine),
            session_id,
            self.period,
            self.events.clone(),
        )));
        Ok(())
    }

    /// Cancel the ticker and end the session early. No-op when idle.
    pub fn stop(&mut self) -> Option<Event> {
        self.cancel_ticker();
        let event = self.lock().stop()?;
        let _ = self.events.send(event.clone());
        Some(event)
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_running()
    }

    /// Read engine state under the lock.
    pub fn with_engine<T>(&self, f: impl FnOnce(&SessionEngine) -> T) -> T {
        f(&self.lock())
    }

    fn cancel_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionEngine> {
        self.engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for SessionDriver {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}

async fn run_ticker(
    engine: Arc<Mutex<SessionEngine>>,
    session_id: u64,
    period: Duration,
    events: mpsc::UnboundedSender<Event>,
) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;
        let produced = {
            let mut engine = engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if engine.session_id() != session_id || !engine.is_running() {
                debug!(session_id, "ticker outlived its session");
                break;
            }
            engine.tick()
        };
        let finished = produced.iter().any(Event::is_completion);
        for event in produced {
            let _ = events.send(event);
        }
        if finished {
            break;
        }
    }
}
