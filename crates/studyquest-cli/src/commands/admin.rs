use clap::Subcommand;
use studyquest_core::{Accounts, UserSummary};

#[derive(Subcommand)]
pub enum AdminAction {
    /// List registered users
    Users {
        /// Print an aligned table instead of JSON
        #[arg(long)]
        table: bool,
    },
    /// Grant the admin role to another account
    Promote {
        /// Email of the account to promote
        email: String,
    },
}

pub fn run(action: AdminAction) -> Result<(), Box<dyn std::error::Error>> {
    let (db, identity) = super::signed_in()?;
    let accounts = Accounts::new(&db);

    match action {
        AdminAction::Users { table } => {
            let users = accounts.list_users(&identity)?;
            if table {
                print_table(&users);
            } else {
                println!("{}", serde_json::to_string_pretty(&users)?);
            }
        }
        AdminAction::Promote { email } => {
            let promoted = accounts.promote(&identity, &email)?;
            println!("{}", serde_json::to_string_pretty(&promoted)?);
        }
    }
    Ok(())
}

fn print_table(users: &[UserSummary]) {
    if users.is_empty() {
        println!("no users");
        return;
    }
    let rows: Vec<[&str; 3]> = users
        .iter()
        .map(|u| {
            [
                u.username.as_deref().unwrap_or("N/A"),
                u.email.as_str(),
                u.created_at.as_deref().unwrap_or("N/A"),
            ]
        })
        .collect();
    let header = ["USERNAME", "EMAIL", "CREATED"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |cells: &[&str; 3]| {
        format!(
            "{:<w0$}  {:<w1$}  {}",
            cells[0],
            cells[1],
            cells[2],
            w0 = widths[0],
            w1 = widths[1]
        )
    };
    println!("{}", line(&header));
    for row in &rows {
        println!("{}", line(row));
    }
}
