//! Git hook installation and management.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tracing::info;

use crate::config::Config;
use crate::error::Error;

/// Pre-commit hook script content. Kept to single patchguard-marked lines so
/// uninstall can strip them without touching the rest of the hook.
fn pre_commit_script(base: &str) -> String {
    format!(
        r#"#!/bin/sh
# patchguard staged-change check (auto-installed)

git diff --cached {base} | patchguard check --base {base} || exit 1
"#
    )
}

/// Check if git is initialized in the project.
pub fn has_git(project_root: &Path) -> bool {
    project_root.join(".git").exists()
}

/// Check if the patchguard hook is already installed.
pub fn hooks_installed(project_root: &Path) -> bool {
    let pre_commit = project_root.join(".git").join("hooks").join("pre-commit");
    if !pre_commit.exists() {
        return false;
    }

    // Check if it's our hook (contains "patchguard")
    fs::read_to_string(&pre_commit)
        .map(|content| content.contains("patchguard"))
        .unwrap_or(false)
}

/// Install the patchguard pre-commit hook.
pub fn install_hooks(project_root: &Path, base: &str) -> Result<(), Error> {
    let git_dir = project_root.join(".git");
    if !git_dir.exists() {
        return Ok(()); // No git, nothing to do
    }

    let hooks_dir = git_dir.join("hooks");
    fs::create_dir_all(&hooks_dir)?;

    let pre_commit_path = hooks_dir.join("pre-commit");
    install_hook(&pre_commit_path, &pre_commit_script(base))?;
    info!("Installed pre-commit hook");

    Ok(())
}

/// Install a single hook, preserving existing hooks.
fn install_hook(path: &Path, content: &str) -> Result<(), Error> {
    let final_content = if path.exists() {
        let existing = fs::read_to_string(path)?;

        // Already has our hook
        if existing.contains("patchguard") {
            return Ok(());
        }

        // Append to existing hook
        format!("{}\n\n{}", existing.trim(), content)
    } else {
        content.to_string()
    };

    fs::write(path, &final_content)?;

    // Make executable
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;

    Ok(())
}

/// Uninstall the patchguard pre-commit hook.
pub fn uninstall_hooks(project_root: &Path) -> Result<(), Error> {
    let hook_path = project_root.join(".git").join("hooks").join("pre-commit");
    if !hook_path.exists() {
        return Ok(());
    }

    let content = fs::read_to_string(&hook_path)?;
    if content.contains("patchguard") {
        let cleaned = remove_patchguard_section(&content);
        if cleaned.trim().is_empty() || cleaned.trim() == "#!/bin/sh" {
            fs::remove_file(&hook_path)?;
        } else {
            fs::write(&hook_path, cleaned)?;
        }
        info!("Removed pre-commit hook");
    }

    Ok(())
}

/// Remove the patchguard section from hook content.
fn remove_patchguard_section(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.contains("patchguard"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run the hooks command.
pub fn run(action: &str) -> Result<i32, Error> {
    let project_root = std::env::current_dir()?;

    match action {
        "install" => {
            if !has_git(&project_root) {
                println!("Not a git repository; nothing to install.");
                return Ok(1);
            }
            let (config, _) = Config::load(&project_root)?;
            install_hooks(&project_root, &config.hooks.base)?;
            println!("Pre-commit hook installed.");
            Ok(0)
        }

        "uninstall" => {
            uninstall_hooks(&project_root)?;
            println!("Pre-commit hook removed.");
            Ok(0)
        }

        "status" => {
            if hooks_installed(&project_root) {
                println!("Pre-commit hook installed.");
            } else {
                println!("Pre-commit hook not installed.");
                println!("Run 'patchguard hooks install' to set it up.");
            }
            Ok(0)
        }

        _ => {
            println!("Unknown action: {}", action);
            println!("Usage: patchguard hooks [install|uninstall|status]");
            Ok(1)
        }
    }
}
