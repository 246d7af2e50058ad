//! patchguard - patch validation gate for git hooks and CI.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use patchguard::cli::{self, Cli, Commands};
use patchguard::Error;

#[tokio::main]
async fn main() {
    // Logging goes to stderr; stdout is reserved for the JSON report.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("patchguard=info".parse().unwrap()))
        .init();

    let cli = Cli::parse();

    // Exit 0 when validation passed, 1 when it failed, 2 on fatal errors
    // that prevent producing any report.
    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("patchguard: {e}");
            2
        }
    };
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

async fn run(cli: Cli) -> Result<i32, Error> {
    match cli.command {
        Commands::Check(args) => cli::check::run(args).await,
        Commands::Init { no_hooks } => {
            cli::init::run(no_hooks)?;
            Ok(0)
        }
        Commands::Hooks { action } => cli::hooks::run(&action),
        Commands::Config => {
            cli::config::run()?;
            Ok(0)
        }
    }
}
