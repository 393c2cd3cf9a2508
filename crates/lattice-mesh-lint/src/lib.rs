//! Lattice mesh lint library

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand, ValueEnum};

/// lattice-mesh-lint - check Istio traffic policy for conflicting definitions
#[derive(Parser, Debug)]
#[command(name = "lattice-mesh-lint")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "text",
        env = "LATTICE_MESH_LOG_FORMAT",
        global = true
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check DestinationRules for conflicting host+subset definitions
    Check(commands::check::CheckArgs),
}

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines (default)
    #[default]
    Text,
    /// JSON lines
    Json,
}

impl Cli {
    /// Run the CLI command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Check(args) => commands::check::run(args),
        }
    }
}
