//! Configuration command handlers.

use super::{ConfigCommands, ConfigFormat};
use fabula::FabulaConfig;
use std::error::Error;

/// Handle a `config` subcommand.
pub fn handle_config_command(
    command: ConfigCommands,
    config: &FabulaConfig,
) -> Result<(), Box<dyn Error>> {
    match command {
        ConfigCommands::Show { format } => {
            let rendered = match format {
                ConfigFormat::Toml => toml::to_string_pretty(config)?,
                ConfigFormat::Json => serde_json::to_string_pretty(config)?,
            };
            println!("{}", rendered);
        }
        ConfigCommands::Validate { path } => {
            FabulaConfig::from_file(&path)?;
            println!("{}: ok", path.display());
        }
    }
    Ok(())
}
