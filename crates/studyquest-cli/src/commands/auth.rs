use clap::Subcommand;
use serde_json::json;
use studyquest_core::storage::Database;
use studyquest_core::{Accounts, Registration};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Show who is signed in
    Status,
}

pub fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let accounts = Accounts::new(&db);

    match action {
        AuthAction::Register {
            email,
            username,
            password,
        } => {
            let identity = accounts.register(Registration {
                email,
                username,
                password,
            })?;
            println!("{}", serde_json::to_string_pretty(&identity)?);
        }
        AuthAction::Login { email, password } => {
            let identity = accounts.login(&email, &password)?;
            println!("{}", serde_json::to_string_pretty(&identity)?);
        }
        AuthAction::Logout => {
            accounts.logout()?;
            println!("signed out");
        }
        AuthAction::Status => {
            let current = accounts.current()?;
            let status = json!({
                "signed_in": current.is_some(),
                "user": current,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}
