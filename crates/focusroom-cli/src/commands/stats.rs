use std::sync::Arc;

use clap::Subcommand;
use focusroom_core::{Config, Database, SessionRecorder};

use super::local_now;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's focus minutes, completed pomodoros and streak
    Today,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Arc::new(Database::open()?);

    match action {
        StatsAction::Today => {
            let recorder = SessionRecorder::new(db, config.user_id());
            let stats = recorder.daily_stats(local_now())?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
