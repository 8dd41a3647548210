//! [`Args`] definitions.

use clap::{Parser, Subcommand};

/// Server of the medicine catalog.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// One-off [`Command`] to run instead of serving.
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Args {
    /// Parses command line arguments.
    ///
    /// # Errors
    ///
    /// Errors if failed to parse command line arguments.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}

/// One-off command.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Creates an administrator account.
    CreateAdmin {
        /// Name of the administrator.
        #[arg(long)]
        name: String,

        /// Email of the administrator.
        #[arg(long)]
        email: String,

        /// Password of the administrator.
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}
