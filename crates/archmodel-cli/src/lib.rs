//! Archmodel command-line driver.
//!
//! Replays JSON edit scripts against a fresh [`archmodel_core::Schema`] and
//! renders the resulting model and event stream.

pub mod config;
pub mod error;
pub mod output;
pub mod script;

pub use config::{Args, Command, ReplayArgs, ReplayConfig};
pub use error::{CliError, Result};
pub use output::{create_formatter, Formatter, OutputFormat};
pub use script::{replay, Replay, Script, Step};

use archmodel_core::SchemaSnapshot;

/// Load, replay and render a script. Returns the text to print.
pub fn run_replay(args: ReplayArgs) -> Result<String> {
    let script = Script::from_path(&args.script)?;
    let config = args.into_config(script.config.clone());
    tracing::debug!(script = %config.script.display(), format = %config.format, "replaying");

    let result = replay(&script, config.model)?;
    let formatter = create_formatter(config.format);

    let mut output = formatter.format_snapshot(&SchemaSnapshot::capture(&result.schema));
    if config.show_events {
        output.push_str("\n\n");
        output.push_str(&formatter.format_events(&result.events.events()));
    }
    Ok(output)
}
