//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use fabula::{ContinuationMode, GenerationMode};
use std::path::PathBuf;

/// Fabula - narrative workflow orchestration with offline template providers
#[derive(Parser, Debug)]
#[command(name = "fabula")]
#[command(about = "Run story generation and chapter continuation workflows", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file to use instead of the default search path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a single passage
    Generate {
        /// Story context JSON file
        #[arg(long)]
        story: Option<PathBuf>,

        /// What the passage should be about
        #[arg(long, default_value = "")]
        input: String,

        /// How the generation is steered
        #[arg(long, default_value = "ai_guided")]
        mode: GenerationMode,

        /// Word budget
        #[arg(long, default_value_t = 1000)]
        words: u32,

        /// Run visual analysis
        #[arg(long)]
        images: bool,

        /// Task identifier (generated when omitted)
        #[arg(long)]
        task_id: Option<String>,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Continue a chapter segment by segment
    Continue {
        /// Story context JSON file
        #[arg(long)]
        story: Option<PathBuf>,

        /// File holding the chapter text written so far
        #[arg(long)]
        previous: PathBuf,

        /// Chapter identifier
        #[arg(long, default_value = "chapter-1")]
        chapter_id: String,

        /// How the loop proceeds between segments
        #[arg(long, default_value = "seamless")]
        mode: ContinuationMode,

        /// Segments to write
        #[arg(long, default_value_t = 5)]
        segments: u32,

        /// Steering for the continuation
        #[arg(long)]
        direction: Option<String>,

        /// Task identifier (generated when omitted)
        #[arg(long)]
        task_id: Option<String>,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show {
        /// Output format
        #[arg(long, default_value = "toml")]
        format: ConfigFormat,
    },

    /// Check a configuration file without running anything
    Validate {
        /// Path to the configuration file
        path: PathBuf,
    },
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Story text followed by warnings and errors
    Human,
    /// Full result as JSON
    Json,
}

/// Configuration output formats
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML, as written in configuration files
    Toml,
    /// JSON
    Json,
}
