use crate::logger;
use crate::GlobalOpts;
use argschema_config::{Config, ConfigError};
use clap::Subcommand;
use colored::Colorize;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print every configured value
    Show,
    /// Print a single value
    Get { key: String },
    /// Set a value (schema-draft, semantics, indent, follow-imports)
    Set { key: String, value: String },
    /// Print the path of the configuration file
    Path,
}

pub fn handle_config(action: Option<ConfigAction>, opts: &GlobalOpts) -> Result<(), ConfigError> {
    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let config = Config::load()?;
            logger::debug(&format!("Reading config from: {}", Config::path()?.display()));
            println!("{}", "Configuration:".bold().green());
            if config.is_empty() {
                if opts.verbosity_level() > 0 {
                    println!("  {}", "(empty)".yellow());
                }
            } else {
                for (key, value) in config.values_iter() {
                    println!("  {}: {}", key.cyan(), value);
                }
            }
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key)? {
                Some(value) => println!("{}", value),
                None => logger::info(&format!("{} is not set", key)),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, value.clone())?;
            config.save()?;
            logger::success(&format!("Set {} = {}", key, value));
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
    }
    Ok(())
}
