use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

mod fetch;
mod parse;
mod profiles;

pub use fetch::Fetch;
pub use profiles::Profiles;

/// Fetch remote resources into local files through named connection profiles.
#[derive(Debug, Parser)]
#[command(name = "ferry", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Profile file (TOML, `[profiles.<name>]` tables)
    #[arg(long, global = true, env = "FERRY_PROFILES", default_value = "ferry.toml")]
    pub profiles: PathBuf,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch one resource and print the result as JSON
    Fetch(Fetch),

    /// List configured profiles
    #[command(visible_alias = "ls")]
    Profiles(Profiles),
}
