//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the fabula binary.

mod commands;
mod config;
mod run;

pub use commands::{Cli, Commands, ConfigCommands, ConfigFormat, OutputFormat};
pub use config::handle_config_command;
pub use run::{await_task, load_story, report, task_id};
