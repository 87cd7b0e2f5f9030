use std::sync::mpsc;
use std::time::Duration;

use clap::{Args, Subcommand};
use serde_json::json;
use studyquest_core::storage::Database;
use studyquest_core::{
    Accounts, Config, Event, PointsReporter, SessionConfig, SessionDriver, SessionEngine,
    SessionOutcome,
};
use tracing::warn;

/// Per-run overrides of the `[session]` config table.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionOverrides {
    /// Session length in seconds
    #[arg(long)]
    duration: Option<u64>,
    /// Seconds between reward rolls
    #[arg(long)]
    interval: Option<u64>,
    /// Points per successful roll
    #[arg(long)]
    amount: Option<u64>,
    /// Chance of a roll succeeding, 0.0 - 1.0
    #[arg(long)]
    probability: Option<f64>,
    /// Seed for reproducible rolls
    #[arg(long)]
    seed: Option<u64>,
}

impl SessionOverrides {
    fn session_config(&self, config: &Config) -> SessionConfig {
        let base = config.session_config();
        SessionConfig {
            duration_secs: self.duration.unwrap_or(base.duration_secs),
            reward_interval_secs: self.interval.unwrap_or(base.reward_interval_secs),
            reward_amount: self.amount.unwrap_or(base.reward_amount),
            reward_probability: self.probability.unwrap_or(base.reward_probability),
        }
    }

    fn seed(&self, config: &Config) -> Option<u64> {
        self.seed.or(config.session.seed)
    }
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a session in real time and credit the points (Ctrl-C stops early)
    Run {
        #[command(flatten)]
        overrides: SessionOverrides,
        /// Milliseconds per tick (defaults to `tick_ms` from the config)
        #[arg(long)]
        tick_ms: Option<u64>,
    },
    /// Play a session out instantly and print what happened; nothing is saved
    Simulate {
        #[command(flatten)]
        overrides: SessionOverrides,
        /// Stop the session after this many ticks
        #[arg(long)]
        stop_after: Option<u64>,
    },
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Run { overrides, tick_ms } => run_live(&overrides, tick_ms),
        SessionAction::Simulate {
            overrides,
            stop_after,
        } => simulate(&overrides, stop_after),
    }
}

fn recording_engine(seed: Option<u64>) -> (SessionEngine, mpsc::Receiver<SessionOutcome>) {
    let (tx, rx) = mpsc::channel();
    let engine = SessionEngine::seeded(seed).on_complete(move |outcome| {
        let _ = tx.send(outcome.clone());
    });
    (engine, rx)
}

fn run_live(
    overrides: &SessionOverrides,
    tick_ms: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let session_config = overrides.session_config(&config);
    session_config.validate()?;
    let period = Duration::from_millis(tick_ms.unwrap_or(config.tick_ms).max(1));

    let db = Database::open()?;
    let identity = Accounts::new(&db).current()?;
    if identity.is_none() {
        warn!("not signed in; points from this session will not be saved");
    }

    let (engine, outcomes) = recording_engine(overrides.seed(&config));
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let (mut driver, mut events) = SessionDriver::new(engine, period);
        driver.start(session_config)?;
        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    println!("{}", serde_json::to_string(&event)?);
                    if event.is_completion() {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    // The completion event arrives on the channel.
                    driver.stop();
                }
            }
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    let outcome = outcomes
        .try_recv()
        .map_err(|_| "session ended without reporting an outcome")?;
    db.record_session(identity.as_ref().map(|i| &i.user_id), &outcome)?;

    let mut reporter = PointsReporter::new(&db);
    let status = reporter.report(identity.as_ref(), &outcome)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "outcome": outcome, "report": status }))?
    );
    Ok(())
}

fn simulate(
    overrides: &SessionOverrides,
    stop_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let session_config = overrides.session_config(&config);
    let expected_points = session_config.expected_points();

    let (mut engine, outcomes) = recording_engine(overrides.seed(&config));
    let mut events = vec![engine.start(session_config)?];
    let mut ticks = 0;
    while engine.is_running() {
        if stop_after == Some(ticks) {
            events.extend(engine.stop());
            break;
        }
        events.extend(engine.tick());
        ticks += 1;
    }

    let outcome = outcomes
        .try_recv()
        .map_err(|_| "session ended without reporting an outcome")?;
    let rolls: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::RewardRolled {
                elapsed_secs,
                granted,
                ..
            } => Some(json!({ "elapsed_secs": elapsed_secs, "granted": granted })),
            _ => None,
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "outcome": outcome,
            "ticks": ticks,
            "rolls": rolls,
            "expected_points": expected_points,
        }))?
    );
    Ok(())
}
