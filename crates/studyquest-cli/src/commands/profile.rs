use clap::Subcommand;
use studyquest_core::Accounts;

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Print the signed-in user's record, including points
    Show,
}

pub fn run(action: ProfileAction) -> Result<(), Box<dyn std::error::Error>> {
    let (db, identity) = super::signed_in()?;

    match action {
        ProfileAction::Show => {
            let profile = Accounts::new(&db).profile(&identity)?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
    }
    Ok(())
}
