//! CLI commands for patchguard.

pub mod check;
pub mod config;
pub mod hooks;
pub mod init;

use clap::{Parser, Subcommand};

/// patchguard - reject patches that lack context or no longer apply
#[derive(Parser)]
#[command(name = "patchguard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a diff against a base revision or directory
    Check(check::CheckArgs),

    /// Create a project config and install the pre-commit hook
    Init {
        /// Skip git hook installation
        #[arg(long)]
        no_hooks: bool,
    },

    /// Manage the pre-commit hook
    Hooks {
        /// Action: install, uninstall or status
        #[arg(default_value = "status")]
        action: String,
    },

    /// Show the effective configuration
    Config,
}
