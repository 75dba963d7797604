use clap::Subcommand;
use focusroom_core::{Config, KeyBindings, ModeDurations, TimerMode};
use serde_json::{json, Map, Value};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "timer.focus_secs", "notifications.sound_enabled")
        key: String,
    },
    /// Set a config value; the result must validate before it is saved
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// Show the stored config with the effective durations and key bindings
    List,
    /// Validate the config file
    Check,
    /// Reset config to defaults
    Reset,
}

fn durations_json(durations: &ModeDurations) -> Value {
    json!({
        "focus_min": durations.minutes(TimerMode::Focus),
        "short_break_min": durations.minutes(TimerMode::ShortBreak),
        "long_break_min": durations.minutes(TimerMode::LongBreak),
        "long_break_interval": durations.long_break_interval(),
    })
}

/// Command name to key name, the same shape `shortcuts.bindings` accepts.
fn bindings_json(bindings: &KeyBindings) -> Value {
    let map: Map<String, Value> = bindings
        .entries()
        .into_iter()
        .map(|(key, command)| (command.to_string(), Value::String(key.to_string())))
        .collect();
    Value::Object(map)
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            let stored = config.get(&key).unwrap_or(value);
            println!("{key} = {stored}");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let durations = config.durations()?;
            let bindings = KeyBindings::from_config(&config.shortcuts)?;
            let view = json!({
                "config": config,
                "effective": {
                    "durations": durations_json(&durations),
                    "bindings": bindings_json(&bindings),
                    "user_id": config.user_id().as_str(),
                },
            });
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        ConfigAction::Check => {
            let config = Config::load()?;
            config.validate()?;
            let durations = config.durations()?;
            println!(
                "ok: focus {} min, short break {} min, long break {} min every {} focus intervals",
                durations.minutes(TimerMode::Focus),
                durations.minutes(TimerMode::ShortBreak),
                durations.minutes(TimerMode::LongBreak),
                durations.long_break_interval()
            );
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
