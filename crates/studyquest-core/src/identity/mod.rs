//! Local account store.
//!
//! Replaces the hosted identity provider: email/password sign-up and
//! sign-in, a persisted "current user", and an admin role that gates the
//! user listing. The first account ever registered becomes the admin.

mod password;
mod types;

pub use types::{Identity, Registration, Role, UserId, UserRecord, UserSummary};

use chrono::Utc;
use tracing::info;

use crate::error::AuthError;
use crate::storage::Database;

pub const MIN_PASSWORD_LEN: usize = 6;

const CURRENT_USER_KEY: &str = "current_user";

/// Account operations over a [`Database`].
pub struct Accounts<'a> {
    db: &'a Database,
}

impl<'a> Accounts<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create an account and sign it in.
    pub fn register(&self, registration: Registration) -> Result<Identity, AuthError> {
        let email = registration.email.trim();
        let username = registration.username.trim();
        if email.is_empty() || username.is_empty() || registration.password.is_empty() {
            return Err(AuthError::MissingFields);
        }
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail(email.to_string()));
        }
        if registration.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword {
                min_len: MIN_PASSWORD_LEN,
            });
        }
        if self.db.user_by_email(email)?.is_some() {
            return Err(AuthError::EmailAlreadyInUse(email.to_string()));
        }

        let mut record = UserRecord {
            id: UserId::generate(),
            email: email.to_string(),
            username: username.to_string(),
            points: 0,
            upgrades: Vec::new(),
            role: Role::User,
            created_at: Some(Utc::now().to_rfc3339()),
        };
        let hash = password::hash_password(&registration.password)?;
        record.role = self.db.register_user(&record, &hash)?;
        self.db.kv_set(CURRENT_USER_KEY, record.id.as_str())?;

        info!(user_id = %record.id, role = record.role.as_str(), "account registered");
        Ok(record.identity())
    }

    /// Verify credentials and make the user current.
    pub fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }
        let (record, hash) = self
            .db
            .user_by_email(email)?
            .ok_or(AuthError::InvalidCredentials)?;
        if !password::verify_password(password, &hash) {
            return Err(AuthError::InvalidCredentials);
        }
        self.db.kv_set(CURRENT_USER_KEY, record.id.as_str())?;
        info!(user_id = %record.id, "signed in");
        Ok(record.identity())
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        self.db.kv_delete(CURRENT_USER_KEY)?;
        Ok(())
    }

    /// The signed-in user, if any.
    pub fn current(&self) -> Result<Option<Identity>, AuthError> {
        let Some(id) = self.db.kv_get(CURRENT_USER_KEY)? else {
            return Ok(None);
        };
        match self.db.user(&UserId::new(id))? {
            Some(record) => Ok(Some(record.identity())),
            None => {
                // Account vanished underneath the session.
                self.db.kv_delete(CURRENT_USER_KEY)?;
                Ok(None)
            }
        }
    }

    pub fn require_current(&self) -> Result<Identity, AuthError> {
        self.current()?.ok_or(AuthError::NotAuthenticated)
    }

    /// Fresh copy of the user's record, including the point balance.
    pub fn profile(&self, identity: &Identity) -> Result<UserRecord, AuthError> {
        self.db
            .user(&identity.user_id)?
            .ok_or(AuthError::NotAuthenticated)
    }

    /// Every registered user. Admin only.
    pub fn list_users(&self, requester: &Identity) -> Result<Vec<UserSummary>, AuthError> {
        self.require_admin(requester)?;
        let users = self.db.list_users()?;
        info!(count = users.len(), "listed users");
        Ok(users.into_iter().map(UserSummary::from).collect())
    }

    /// Grant the admin role. Admin only.
    pub fn promote(&self, requester: &Identity, email: &str) -> Result<Identity, AuthError> {
        self.require_admin(requester)?;
        let (record, _) = self
            .db
            .user_by_email(email.trim())?
            .ok_or_else(|| AuthError::UnknownEmail(email.to_string()))?;
        self.db.set_role(&record.id, Role::Admin)?;
        info!(user_id = %record.id, by = %requester.user_id, "promoted to admin");
        Ok(Identity {
            role: Role::Admin,
            ..record.identity()
        })
    }

    // The stored role wins over whatever the caller's copy says.
    fn require_admin(&self, requester: &Identity) -> Result<(), AuthError> {
        match self.db.user(&requester.user_id)? {
            Some(record) if record.role == Role::Admin => Ok(()),
            Some(_) => Err(AuthError::Forbidden),
            None => Err(AuthError::NotAuthenticated),
        }
    }
}

/// `local@domain.tld`, no whitespace.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(email: &str, username: &str, password: &str) -> Registration {
        Registration {
            email: email.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last@uni.edu.mx"));
        assert!(!is_valid_email("ab.co"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@bco"));
        assert!(!is_valid_email("a@b.co."));
        assert!(!is_valid_email("a@@b.co"));
        assert!(!is_valid_email("a b@c.co"));
    }

    #[test]
    fn first_account_is_admin() {
        let db = Database::open_memory().unwrap();
        let accounts = Accounts::new(&db);
        let first = accounts
            .register(registration("ana@example.com", "ana", "secret1"))
            .unwrap();
        let second = accounts
            .register(registration("bo@example.com", "bo", "secret2"))
            .unwrap();
        assert_eq!(first.role, Role::Admin);
        assert_eq!(second.role, Role::User);
        // Registration signs the new account in.
        assert_eq!(accounts.current().unwrap(), Some(second));
    }

    #[test]
    fn registration_validation() {
        let db = Database::open_memory().unwrap();
        let accounts = Accounts::new(&db);
        assert!(matches!(
            accounts.register(registration("", "ana", "secret1")),
            Err(AuthError::MissingFields)
        ));
        assert!(matches!(
            accounts.register(registration("a@b.co", "   ", "secret1")),
            Err(AuthError::MissingFields)
        ));
        assert!(matches!(
            accounts.register(registration("not-an-email", "ana", "secret1")),
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            accounts.register(registration("a@b.co", "ana", "12345")),
            Err(AuthError::WeakPassword { min_len: 6 })
        ));

        accounts
            .register(registration("a@b.co", "ana", "123456"))
            .unwrap();
        assert!(matches!(
            accounts.register(registration("A@B.CO", "other", "123456")),
            Err(AuthError::EmailAlreadyInUse(_))
        ));
    }

    #[test]
    fn login_logout_cycle() {
        let db = Database::open_memory().unwrap();
        let accounts = Accounts::new(&db);
        let ana = accounts
            .register(registration("ana@example.com", "ana", "secret1"))
            .unwrap();
        accounts.logout().unwrap();
        assert_eq!(accounts.current().unwrap(), None);
        assert!(matches!(
            accounts.require_current(),
            Err(AuthError::NotAuthenticated)
        ));

        assert!(matches!(
            accounts.login("ana@example.com", "wrong!!"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.login("nobody@example.com", "secret1"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.login("", "secret1"),
            Err(AuthError::MissingFields)
        ));

        let again = accounts.login(" ana@example.com ", "secret1").unwrap();
        assert_eq!(again, ana);
        assert_eq!(accounts.current().unwrap(), Some(ana));

        accounts.logout().unwrap();
        accounts.logout().unwrap();
    }

    #[test]
    fn listing_requires_admin() {
        let db = Database::open_memory().unwrap();
        let accounts = Accounts::new(&db);
        let admin = accounts
            .register(registration("root@example.com", "root", "secret1"))
            .unwrap();
        let user = accounts
            .register(registration("bo@example.com", "bo", "secret2"))
            .unwrap();

        assert!(matches!(
            accounts.list_users(&user),
            Err(AuthError::Forbidden)
        ));
        // A forged role on the caller's side does not help.
        let forged = Identity {
            role: Role::Admin,
            ..user.clone()
        };
        assert!(matches!(
            accounts.list_users(&forged),
            Err(AuthError::Forbidden)
        ));

        let listed = accounts.list_users(&admin).unwrap();
        let emails: Vec<&str> = listed.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["root@example.com", "bo@example.com"]);
        assert_eq!(listed[1].username.as_deref(), Some("bo"));
    }

    #[test]
    fn promote_grants_admin() {
        let db = Database::open_memory().unwrap();
        let accounts = Accounts::new(&db);
        let admin = accounts
            .register(registration("root@example.com", "root", "secret1"))
            .unwrap();
        let user = accounts
            .register(registration("bo@example.com", "bo", "secret2"))
            .unwrap();

        assert!(matches!(
            accounts.promote(&user, "bo@example.com"),
            Err(AuthError::Forbidden)
        ));
        assert!(matches!(
            accounts.promote(&admin, "ghost@example.com"),
            Err(AuthError::UnknownEmail(_))
        ));
        let promoted = accounts.promote(&admin, "bo@example.com").unwrap();
        assert!(promoted.is_admin());
        assert!(accounts.list_users(&user).is_ok());
    }

    #[test]
    fn profile_starts_empty() {
        let db = Database::open_memory().unwrap();
        let accounts = Accounts::new(&db);
        let ana = accounts
            .register(registration("ana@example.com", "ana", "secret1"))
            .unwrap();
        let profile = accounts.profile(&ana).unwrap();
        assert_eq!(profile.points, 0);
        assert!(profile.upgrades.is_empty());
        assert!(profile.created_at.is_some());
    }
}
