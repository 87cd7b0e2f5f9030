use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::PointsLedger;
use crate::error::LedgerError;
use crate::identity::Identity;
use crate::timer::SessionOutcome;

/// What happened to a session's points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportStatus {
    /// Points were added; `balance` is the new total.
    Credited { points: u64, balance: u64 },
    /// Nobody is signed in, so the points are dropped.
    SkippedNoIdentity,
    /// The session accrued nothing.
    NothingToCredit,
    /// This session was already handled.
    AlreadyReported,
}

/// Credits finished sessions to a ledger, at most once per session id.
///
/// Failures are returned, never retried.
pub struct PointsReporter<L> {
    ledger: L,
    /// Session ids restart at 1 in every engine, so the start time is part
    /// of the key; one reporter can serve several engines.
    reported: HashSet<(u64, DateTime<Utc>)>,
}

impl<L: PointsLedger> PointsReporter<L> {
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            reported: HashSet::new(),
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn report(
        &mut self,
        identity: Option<&Identity>,
        outcome: &SessionOutcome,
    ) -> Result<ReportStatus, LedgerError> {
        if !self
            .reported
            .insert((outcome.session_id, outcome.started_at))
        {
            debug!(session_id = outcome.session_id, "session already reported");
            return Ok(ReportStatus::AlreadyReported);
        }
        let Some(identity) = identity else {
            debug!(
                session_id = outcome.session_id,
                points = outcome.accrued_points,
                "no signed-in user, points dropped"
            );
            return Ok(ReportStatus::SkippedNoIdentity);
        };
        if outcome.accrued_points == 0 {
            return Ok(ReportStatus::NothingToCredit);
        }

        match self
            .ledger
            .increment_points(&identity.user_id, outcome.accrued_points)
        {
            Ok(balance) => {
                info!(
                    user_id = %identity.user_id,
                    points = outcome.accrued_points,
                    balance,
                    "points credited"
                );
                Ok(ReportStatus::Credited {
                    points: outcome.accrued_points,
                    balance,
                })
            }
            Err(err) => {
                warn!(
                    user_id = %identity.user_id,
                    points = outcome.accrued_points,
                    error = %err,
                    "failed to credit points"
                );
                Err(err)
            }
        }
    }
}
