use chrono::{Duration, Utc};
use clap::Subcommand;
use focusroom_core::{Config, Database, SessionStore};

use super::local_now;

#[derive(Subcommand)]
pub enum SessionAction {
    /// List recorded sessions, oldest first
    List {
        /// Only today's sessions (local calendar day)
        #[arg(long, conflicts_with = "days")]
        today: bool,
        /// Look back this many days
        #[arg(long, default_value = "7")]
        days: i64,
    },
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let user = config.user_id();

    match action {
        SessionAction::List { today, days } => {
            let now = local_now();
            let sessions = if today {
                db.list_today(&user, now)?
            } else {
                db.list_since(&user, now.with_timezone(&Utc) - Duration::days(days))?
            };
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
    }
    Ok(())
}
