//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stagen incremental static site generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Site root directory (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Output directory path (relative to site root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Content directory path (relative to site root)
    #[arg(short, long)]
    pub content: Option<PathBuf>,

    /// Config file name (default: stagen.toml)
    #[arg(short = 'C', long, default_value = "stagen.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Shared arguments for Build and Watch commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Wipe output directory and persisted build state before building
    #[arg(long)]
    pub clean: bool,

    /// Include unpublished content (`published: false`)
    #[arg(short, long)]
    pub all: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build every new or changed content file and cascade to dependents
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Remove generated output and persisted build state
    Clean,

    /// Build, then rebuild incrementally on content changes until Ctrl+C
    Watch {
        #[command(flatten)]
        build_args: BuildArgs,
    },
}

impl Cli {
    /// Build arguments of the current command, if it takes any.
    pub const fn build_args(&self) -> Option<&BuildArgs> {
        match &self.command {
            Commands::Build { build_args } | Commands::Watch { build_args } => Some(build_args),
            Commands::Clean => None,
        }
    }

    #[allow(unused)]
    pub const fn is_watch(&self) -> bool {
        matches!(self.command, Commands::Watch { .. })
    }
}
