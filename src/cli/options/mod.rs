//! The options for the tlsca command.

//------------ Sub-modules ---------------------------------------------------

mod ca;


//------------ Content -------------------------------------------------------

use std::path::PathBuf;
use clap::Parser;
use crate::ca::{OpenSslBackend, Reconciler, ReconcilerConfig};
use crate::config::Config;
use crate::constants::{TLSCA_ENV_CONFIG, TLSCA_ENV_FORMAT};
use super::report::{Report, ReportFormat};

pub use self::ca::{Absent, Location, Present, Show};


//------------ Options -------------------------------------------------------

/// The command line options for tlsca.
#[derive(clap::Parser)]
#[command(
    version,
    about = "Keeps self-signed certificate authorities in the declared state.",
)]
pub struct Options {
    #[command(flatten)]
    pub general: GeneralOptions,

    #[command(subcommand)]
    pub command: Command,
}

impl Options {
    /// Creates the options from the process arguments.
    ///
    /// If the arguments won’t result in usable options, exits the process.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Runs the command against the CAs kept below the configured storage
    /// directory.
    pub fn run(self, config: &Config) -> Report {
        let reconciler =
            Reconciler::new(OpenSslBackend::new(config.storage_dir.clone()));
        let reconciler_config = ReconcilerConfig {
            dry_run: self.general.test,
        };
        self.command.run(&reconciler, config, &reconciler_config)
    }
}


//------------ GeneralOptions ------------------------------------------------

/// The options common to all commands.
#[derive(clap::Args)]
pub struct GeneralOptions {
    /// Path to the configuration file [default: /etc/tlsca.conf if present]
    #[arg(short, long, env = TLSCA_ENV_CONFIG, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(
        short, long,
        env = TLSCA_ENV_FORMAT,
        default_value = "text",
    )]
    pub format: ReportFormat,

    /// Only report what would be changed
    #[arg(long)]
    pub test: bool,
}


//------------ Command -------------------------------------------------------

#[derive(clap::Subcommand)]
pub enum Command {
    /// Make sure a CA exists and matches the given parameters
    Present(Present),

    /// Make sure a CA and its private key are removed
    Absent(Absent),

    /// Show the certificate of an existing CA
    Show(Show),
}

impl Command {
    pub fn run(
        self,
        reconciler: &Reconciler<OpenSslBackend>,
        config: &Config,
        reconciler_config: &ReconcilerConfig,
    ) -> Report {
        match self {
            Self::Present(cmd) => cmd.run(reconciler, config, reconciler_config),
            Self::Absent(cmd) => cmd.run(reconciler, reconciler_config),
            Self::Show(cmd) => cmd.run(reconciler),
        }
    }
}
