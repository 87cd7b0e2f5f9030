pub mod admin;
pub mod auth;
pub mod config;
pub mod profile;
pub mod session;
pub mod stats;

use studyquest_core::storage::Database;
use studyquest_core::{Accounts, Identity};

/// Open the database and resolve the signed-in user, failing when signed out.
pub(crate) fn signed_in() -> Result<(Database, Identity), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let identity = Accounts::new(&db).require_current()?;
    Ok((db, identity))
}
