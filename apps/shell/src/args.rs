//! # CLI Argument Definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fstone")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Feature rollout, migration and validation console for Flagstone")]
pub struct Cli {
    /// Configuration file (toml, json or yaml); `FSTONE__*` variables override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Persist state in this directory (selects the file store)
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// JSON description of the host environment; a modern desktop browser by default
    #[arg(short, long, global = true)]
    pub environment: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct UserArg {
    /// Acting user id
    #[arg(short, long)]
    pub user: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show every feature with its committed state
    Status,
    /// Run the enable workflow for a feature
    Enable {
        id: String,
        #[command(flatten)]
        user: UserArg,
    },
    /// Disable a feature
    Disable {
        id: String,
        #[command(flatten)]
        user: UserArg,
    },
    /// Enable several features, dependencies first
    Batch {
        #[arg(required = true)]
        ids: Vec<String>,
        #[command(flatten)]
        user: UserArg,
    },
    /// Evaluate a flag for a user and explain the decision
    Evaluate {
        id: String,
        #[command(flatten)]
        user: UserArg,
        /// Group membership of the user (repeatable)
        #[arg(short, long = "group")]
        groups: Vec<String>,
        /// Device type, e.g. `mobile`
        #[arg(long)]
        device: Option<String>,
    },
    /// Run the validation rules over the whole system
    Validate,
    /// Summarize the integration health
    Health,
    /// Suggest features for a user
    Recommend {
        #[command(flatten)]
        user: UserArg,
    },
    /// Export the configuration as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Import flag definitions from a JSON file
    Import { file: PathBuf },
}
