//! Initialize patchguard for a project.

use tracing::{info, warn};

use crate::cli::hooks;
use crate::config::{Config, InternalConfig, PROJECT_CONFIG_FILE};
use crate::error::Error;

/// Run the init command.
pub fn run(no_hooks: bool) -> Result<(), Error> {
    let project_root = std::env::current_dir()?;
    let config_path = Config::project_path(&project_root);

    if config_path.exists() {
        println!("patchguard already initialized in this project.");
        println!("Edit {} to adjust the policy.", PROJECT_CONFIG_FILE);
        return Ok(());
    }

    let mut config = Config::default();
    config.internal = Some(InternalConfig {
        initialized_at: chrono::Utc::now().to_rfc3339(),
    });
    config.save(&project_root)?;
    info!(path = %config_path.display(), "created project config");
    println!("Created {}.", PROJECT_CONFIG_FILE);

    if !no_hooks && config.hooks.auto_install && hooks::has_git(&project_root) {
        if let Err(e) = hooks::install_hooks(&project_root, &config.hooks.base) {
            warn!(error = %e, "failed to install git hook");
        } else {
            println!("Pre-commit hook installed.");
        }
    }

    println!("patchguard initialized.");
    Ok(())
}
