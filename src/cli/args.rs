//! Command-line flags and their conversion into a [`PatchConfig`].

use std::path::PathBuf;

use clap::Parser;

use zapsite::config::check_flag_conflicts;
use zapsite::{DEFAULT_FIELD_KEY, PatchConfig, PatchError};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT"),
    ", built ",
    env!("BUILD_DATETIME"),
    ")"
);

/// Inject call-site fields into zap logging calls in Go sources
#[derive(Parser, Debug)]
#[command(name = "zapsite", version, long_version = LONG_VERSION, about, after_help = "\
Without --write the patched regions are only previewed.\n\
Example: zapsite --path ./service --exclude mocks,cmd/tools --write")]
pub(crate) struct Cli {
    /// File or directory to scan
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Field key to inject, e.g. file:line or log_site [default: fl]
    #[arg(long)]
    pub field: Option<String>,

    /// Field key to delete instead of injecting
    #[arg(long)]
    pub del: Option<String>,

    /// Write changes back to the files
    #[arg(long)]
    pub write: bool,

    /// Include the enclosing function in the injected value
    #[arg(long)]
    pub with_func: bool,

    /// Only check existing injections and print a summary
    #[arg(long)]
    pub verify: bool,

    /// Comma-separated directories or files to skip
    #[arg(long, default_value = "")]
    pub exclude: String,

    /// Field index to insert at, counted after the message (-1 = first)
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub position: i64,

    /// Sort zap fields by key
    #[arg(long)]
    pub sort: bool,

    /// Print the verify summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Log level for diagnostics on stderr: error, warn, info, debug, trace
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Validate flags into the run configuration. Fails before any file is read.
    pub fn to_config(&self) -> Result<PatchConfig, PatchError> {
        let delete_key = self.del.clone().filter(|k| !k.is_empty());
        check_flag_conflicts(delete_key.is_some(), self.field.is_some())?;

        let field_key = self.field.clone().unwrap_or_else(|| DEFAULT_FIELD_KEY.to_string());
        if field_key.is_empty() {
            return Err(PatchError::InvalidArgs("--field must not be empty".to_string()));
        }

        Ok(PatchConfig {
            field_key,
            delete_key,
            write: self.write,
            with_func: self.with_func,
            verify: self.verify,
            position: usize::try_from(self.position).ok(),
            sort: self.sort,
        })
    }
}
