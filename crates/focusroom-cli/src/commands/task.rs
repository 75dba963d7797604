//! Task management commands for CLI.

use clap::Subcommand;
use focusroom_core::{Config, Database, TaskId, TaskStore};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
        /// Space the task belongs to (e.g. "Work")
        #[arg(long)]
        space: Option<String>,
        /// Icon shown next to the space label
        #[arg(long)]
        icon: Option<String>,
    },
    /// List tasks
    List {
        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },
    /// Mark a task complete
    Complete {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let user = config.user_id();

    match action {
        TaskAction::Add { title, space, icon } => {
            if title.trim().is_empty() {
                return Err("task title must not be empty".into());
            }
            let task = db.create_task(&user, title.trim(), space.as_deref(), icon.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List { all } => {
            let tasks = db.list_tasks(&user, all)?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        TaskAction::Complete { id } => {
            db.mark_complete(&TaskId::new(id.clone()))?;
            println!("Task completed: {id}");
        }
    }
    Ok(())
}
