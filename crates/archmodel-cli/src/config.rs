//! Command-line arguments.

use std::path::PathBuf;

use archmodel_core::ModelConfig;
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

/// Relational schema model driver.
#[derive(Parser, Debug)]
#[command(name = "archmodel")]
#[command(version, about = "Replay edit scripts against a relational schema model", long_about = None)]
pub struct Args {
    /// Log cascade decisions at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a JSON edit script against a fresh schema and print the result.
    Replay(ReplayArgs),
}

#[derive(clap::Args, Debug)]
pub struct ReplayArgs {
    /// Path to the script.
    pub script: PathBuf,

    /// Output format.
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Start every table with automatic key cascades disabled. Overrides
    /// the script.
    #[arg(long)]
    pub no_magic: bool,

    /// Also print every event the replay emitted.
    #[arg(long)]
    pub events: bool,
}

/// Settings for one replay run.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub script: PathBuf,
    pub format: OutputFormat,
    pub show_events: bool,
    pub model: ModelConfig,
}

impl ReplayArgs {
    /// Merge the arguments over the configuration a script carries.
    pub fn into_config(self, script_config: Option<ModelConfig>) -> ReplayConfig {
        let mut model = script_config.unwrap_or_default();
        if self.no_magic {
            model = model.with_magic_enabled_by_default(false);
        }

        ReplayConfig {
            script: self.script,
            format: self.format,
            show_events: self.events,
            model,
        }
    }
}

impl Args {
    /// Filter directive used when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "archmodel_cli=debug,archmodel_core=debug"
        } else {
            "archmodel_cli=info,archmodel_core=warn"
        }
    }
}
