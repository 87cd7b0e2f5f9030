//! Per-user point balances.
//!
//! The engine only reports how many points a session accrued; crediting them
//! is the host's job, done through a [`PointsLedger`] and usually the
//! [`PointsReporter`] wrapper.

mod reporter;

pub use reporter::{PointsReporter, ReportStatus};

use crate::error::{DatabaseError, LedgerError};
use crate::identity::UserId;
use crate::storage::Database;

/// Store of point balances keyed by user.
pub trait PointsLedger {
    /// Atomically add `amount` to the user's balance and return the new one.
    fn increment_points(&self, user_id: &UserId, amount: u64) -> Result<u64, LedgerError>;
}

impl PointsLedger for Database {
    fn increment_points(&self, user_id: &UserId, amount: u64) -> Result<u64, LedgerError> {
        match self.add_points(user_id, amount) {
            Ok(Some(balance)) => Ok(balance),
            Ok(None) => Err(LedgerError::UnknownUser(user_id.to_string())),
            Err(DatabaseError::Overflow { balance, amount }) => Err(LedgerError::Overflow {
                user: user_id.to_string(),
                balance,
                amount,
            }),
            Err(err) => Err(err.into()),
        }
    }
}

impl<L: PointsLedger + ?Sized> PointsLedger for &L {
    fn increment_points(&self, user_id: &UserId, amount: u64) -> Result<u64, LedgerError> {
        (**self).increment_points(user_id, amount)
    }
}
