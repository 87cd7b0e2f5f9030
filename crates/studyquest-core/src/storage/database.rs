//! SQLite-based storage for accounts, points and session history.
//!
//! Provides persistent storage for:
//! - User records and their point balances
//! - Finished sessions and per-user statistics
//! - Key-value store for application state (the signed-in user)

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{CoreError, DatabaseError};
use crate::identity::{Role, UserId, UserRecord};
use crate::timer::SessionOutcome;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub user_id: Option<UserId>,
    pub duration_secs: u64,
    pub elapsed_secs: u64,
    pub accrued_points: u64,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Stats {
    pub total_sessions: u64,
    pub completed_sessions: u64,
    pub stopped_sessions: u64,
    pub total_points: u64,
    pub total_study_secs: u64,
}

/// Largest balance SQLite can store as an integer.
const MAX_POINTS: u64 = i64::MAX as u64;

/// SQLite database for StudyQuest.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/studyquest.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("studyquest.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id            TEXT PRIMARY KEY,
                email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
                username      TEXT NOT NULL DEFAULT '',
                password_hash TEXT NOT NULL,
                points        INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
                upgrades      TEXT NOT NULL DEFAULT '[]',
                role          TEXT NOT NULL DEFAULT 'user',
                created_at    TEXT
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id        TEXT,
                duration_secs  INTEGER NOT NULL,
                elapsed_secs   INTEGER NOT NULL,
                accrued_points INTEGER NOT NULL,
                cancelled      INTEGER NOT NULL,
                started_at     TEXT NOT NULL,
                completed_at   TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_user_completed_at ON sessions(user_id, completed_at);",
        )?;
        Ok(())
    }

    // ── Users ────────────────────────────────────────────────────────

    /// Insert a new user row with the role it carries.
    pub fn insert_user(&self, user: &UserRecord, password_hash: &str) -> Result<(), DatabaseError> {
        insert_user_row(&self.conn, user, user.role, password_hash)
    }

    /// Insert a newly registered user, making them admin when no user exists yet.
    ///
    /// The emptiness check and the insert share one immediate transaction, so
    /// two concurrent registrations cannot both become admin. The role
    /// carried by `user` is ignored; the granted role is returned.
    pub fn register_user(&self, user: &UserRecord, password_hash: &str) -> Result<Role, DatabaseError> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let existing: u64 = tx.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        let role = if existing == 0 { Role::Admin } else { Role::User };
        insert_user_row(&tx, user, role, password_hash)?;
        tx.commit()?;
        Ok(role)
    }

    pub fn user(&self, id: &UserId) -> Result<Option<UserRecord>, DatabaseError> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, username, points, upgrades, role, created_at
                 FROM users WHERE id = ?1",
                params![id.as_str()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Look a user up by email (case-insensitive) along with the stored hash.
    pub fn user_by_email(&self, email: &str) -> Result<Option<(UserRecord, String)>, DatabaseError> {
        let found = self
            .conn
            .query_row(
                "SELECT id, email, username, points, upgrades, role, created_at, password_hash
                 FROM users WHERE email = ?1",
                params![email],
                |row| Ok((row_to_user(row)?, row.get::<_, String>(7)?)),
            )
            .optional()?;
        Ok(found)
    }

    /// All users, oldest first.
    pub fn list_users(&self) -> Result<Vec<UserRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, username, points, upgrades, role, created_at
             FROM users ORDER BY created_at IS NULL, created_at, rowid",
        )?;
        let rows = stmt.query_map([], row_to_user)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Returns false when no such user exists.
    pub fn set_role(&self, id: &UserId, role: Role) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE users SET role = ?1 WHERE id = ?2",
            params![role.as_str(), id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Add `amount` to a user's balance.
    ///
    /// Returns the new balance, or `None` when the user does not exist.
    /// Balances are capped at `i64::MAX` (SQLite's integer range); an
    /// increment past it fails with [`DatabaseError::Overflow`] and leaves
    /// the stored balance untouched.
    pub fn add_points(&self, id: &UserId, amount: u64) -> Result<Option<u64>, DatabaseError> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let Some(balance) = tx
            .query_row(
                "SELECT points FROM users WHERE id = ?1",
                params![id.as_str()],
                |row| row.get::<_, u64>(0),
            )
            .optional()?
        else {
            return Ok(None);
        };

        let updated = balance
            .checked_add(amount)
            .filter(|total| *total <= MAX_POINTS)
            .ok_or(DatabaseError::Overflow { balance, amount })?;
        tx.execute(
            "UPDATE users SET points = ?1 WHERE id = ?2",
            params![updated, id.as_str()],
        )?;
        tx.commit()?;
        Ok(Some(updated))
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// Record a finished session.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(
        &self,
        user_id: Option<&UserId>,
        outcome: &SessionOutcome,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO sessions (user_id, duration_secs, elapsed_secs, accrued_points, cancelled, started_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user_id.map(UserId::as_str),
                outcome.duration_secs,
                outcome.elapsed_secs,
                outcome.accrued_points,
                outcome.cancelled,
                outcome.started_at.to_rfc3339(),
                outcome.ended_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent sessions of a user, newest first.
    pub fn recent_sessions(&self, user_id: &UserId, limit: usize) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, duration_secs, elapsed_secs, accrued_points, cancelled, started_at, completed_at
             FROM sessions WHERE user_id = ?1
             ORDER BY completed_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id.as_str(), limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, u64>(4)?,
                row.get::<_, bool>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, user, duration_secs, elapsed_secs, accrued_points, cancelled, started, completed) = row?;
            records.push(SessionRecord {
                id,
                user_id: user.map(UserId::new),
                duration_secs,
                elapsed_secs,
                accrued_points,
                cancelled,
                started_at: parse_timestamp(&started)?,
                completed_at: parse_timestamp(&completed)?,
            });
        }
        Ok(records)
    }

    pub fn stats_today(&self, user_id: &UserId) -> Result<Stats, DatabaseError> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        self.stats_since(user_id, &format!("{today}T00:00:00+00:00"))
    }

    pub fn stats_all(&self, user_id: &UserId) -> Result<Stats, DatabaseError> {
        self.stats_since(user_id, "")
    }

    fn stats_since(&self, user_id: &UserId, since: &str) -> Result<Stats, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT cancelled, COUNT(*), COALESCE(SUM(accrued_points), 0), COALESCE(SUM(elapsed_secs), 0)
             FROM sessions
             WHERE user_id = ?1 AND completed_at >= ?2
             GROUP BY cancelled",
        )?;

        let mut stats = Stats::default();
        let rows = stmt.query_map(params![user_id.as_str(), since], |row| {
            Ok((
                row.get::<_, bool>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
            ))
        })?;

        for row in rows {
            let (cancelled, count, points, secs) = row?;
            stats.total_sessions += count;
            stats.total_points += points;
            stats.total_study_secs += secs;
            if cancelled {
                stats.stopped_sessions += count;
            } else {
                stats.completed_sessions += count;
            }
        }
        Ok(stats)
    }

    // ── Key-value ────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn insert_user_row(
    conn: &Connection,
    user: &UserRecord,
    role: Role,
    password_hash: &str,
) -> Result<(), DatabaseError> {
    let upgrades = serde_json::to_string(&user.upgrades).map_err(|e| DatabaseError::Corrupt {
        table: "users".into(),
        message: e.to_string(),
    })?;
    conn.execute(
        "INSERT INTO users (id, email, username, password_hash, points, upgrades, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.id.as_str(),
            user.email,
            user.username,
            password_hash,
            user.points,
            upgrades,
            role.as_str(),
            user.created_at,
        ],
    )?;
    Ok(())
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    let upgrades: String = row.get(4)?;
    let upgrades = serde_json::from_str(&upgrades).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(UserRecord {
        id: UserId::new(row.get::<_, String>(0)?),
        email: row.get(1)?,
        username: row.get(2)?,
        points: row.get(3)?,
        upgrades,
        role: Role::parse(&row.get::<_, String>(5)?),
        created_at: row.get(6)?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Corrupt {
            table: "sessions".into(),
            message: format!("bad timestamp '{raw}': {e}"),
        })
}
