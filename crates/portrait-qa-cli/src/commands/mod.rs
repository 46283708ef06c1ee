//! CLI command definitions and handlers.

pub mod check;

use clap::{Parser, Subcommand};

/// Portrait QA - photo admissibility checks for personalised illustrations
#[derive(Parser)]
#[command(name = "portrait-qa")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Shared check arguments (paths, options, flags).
    #[command(flatten)]
    pub check: check::CheckArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Validate photos as reference images
    Check(check::CheckArgs),
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every image was admissible.
    Success,
    /// At least one image was rejected.
    Invalid,
    /// Configuration, provider or storage failure.
    Error,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        match code {
            ExitCode::Success => Self::SUCCESS,
            ExitCode::Invalid => Self::from(1),
            ExitCode::Error => Self::from(2),
        }
    }
}
