//! Configuration management for patchguard.
//!
//! Settings resolve with project-then-global precedence: a `.patchguard.toml`
//! at the project root shadows `~/.patchguard/config.toml`, which shadows the
//! built-in defaults. CLI flags override individual fields on top of this.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;
use crate::runner::{ExtensionFilter, RunnerOptions};

/// Project config file name, committed alongside the code it governs.
pub const PROJECT_CONFIG_FILE: &str = ".patchguard.toml";

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Project(PathBuf),
    Global(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Project(p) => write!(f, "project config {}", p.display()),
            ConfigSource::Global(p) => write!(f, "global config {}", p.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

/// patchguard configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub check: CheckConfig,

    #[serde(default)]
    pub hooks: HooksConfig,

    /// Internal state (managed by `patchguard init`, not user-editable).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<InternalConfig>,
}

/// Validation policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Minimum context lines required on each side of a change.
    #[serde(default = "default_min_context")]
    pub min_context: u32,

    /// File extensions subject to validation. Empty means all files.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Compare lines with trailing whitespace stripped.
    #[serde(default)]
    pub ignore_trailing_ws: bool,

    /// Treat resolver failures as fatal instead of per-file issues.
    #[serde(default)]
    pub strict_resolver: bool,

    /// Per-file resolution timeout for concurrent runs, in seconds.
    #[serde(default = "default_resolver_timeout_secs")]
    pub resolver_timeout_secs: u64,
}

/// Git hook behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HooksConfig {
    /// Install the pre-commit hook during `patchguard init` when a git
    /// repository is detected.
    #[serde(default = "default_true")]
    pub auto_install: bool,

    /// Base revision the hook validates staged changes against.
    #[serde(default = "default_hook_base")]
    pub base: String,
}

/// Internal state (managed by the tool, not user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalConfig {
    pub initialized_at: String,
}

fn default_true() -> bool {
    true
}

fn default_min_context() -> u32 {
    3
}

fn default_extensions() -> Vec<String> {
    vec!["py".to_string(), "json".to_string()]
}

fn default_resolver_timeout_secs() -> u64 {
    10
}

fn default_hook_base() -> String {
    "HEAD".to_string()
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            min_context: default_min_context(),
            extensions: default_extensions(),
            ignore_trailing_ws: false,
            strict_resolver: false,
            resolver_timeout_secs: default_resolver_timeout_secs(),
        }
    }
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            auto_install: true,
            base: default_hook_base(),
        }
    }
}

impl Config {
    /// Path of the project config file for a project root.
    pub fn project_path(project_root: &Path) -> PathBuf {
        project_root.join(PROJECT_CONFIG_FILE)
    }

    /// Path to the global patchguard directory (~/.patchguard/).
    pub fn global_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".patchguard")
    }

    /// Path to the global config file.
    pub fn global_path() -> PathBuf {
        Self::global_dir().join("config.toml")
    }

    /// Load configuration with project-then-global precedence.
    pub fn load(project_root: &Path) -> Result<(Self, ConfigSource), Error> {
        let project = Self::project_path(project_root);
        if project.exists() {
            return Ok((Self::from_file(&project)?, ConfigSource::Project(project)));
        }
        let global = Self::global_path();
        if global.exists() {
            return Ok((Self::from_file(&global)?, ConfigSource::Global(global)));
        }
        Ok((Self::default(), ConfigSource::Defaults))
    }

    fn from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Save as the project config file.
    pub fn save(&self, project_root: &Path) -> Result<(), Error> {
        let path = Self::project_path(project_root);
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;

        // Header comment for people opening the file directly.
        let with_header = format!(
            "# patchguard configuration\n# Checked by 'patchguard check'; see 'patchguard config' for the effective settings\n\n{}",
            content
        );

        std::fs::write(&path, with_header)?;
        Ok(())
    }

    /// Runner options derived from this config.
    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            min_context: self.check.min_context,
            ignore_trailing_ws: self.check.ignore_trailing_ws,
            strict_resolver: self.check.strict_resolver,
            fail_fast: false,
            resolver_timeout: Duration::from_secs(self.check.resolver_timeout_secs),
        }
    }

    /// Extension filter derived from this config.
    pub fn extension_filter(&self) -> ExtensionFilter {
        ExtensionFilter::new(&self.check.extensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.check.min_context, 3);
        assert_eq!(config.check.extensions, vec!["py", "json"]);
        assert!(!config.check.ignore_trailing_ws);
        assert!(config.hooks.auto_install);
        assert_eq!(config.hooks.base, "HEAD");
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();

        let mut config = Config::default();
        config.check.min_context = 5;
        config.internal = Some(InternalConfig {
            initialized_at: chrono::Utc::now().to_rfc3339(),
        });
        config.save(dir.path()).unwrap();

        let (loaded, source) = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.check.min_context, 5);
        assert!(loaded.internal.is_some());
        assert_eq!(
            source,
            ConfigSource::Project(dir.path().join(PROJECT_CONFIG_FILE))
        );
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "[check]\nmin_context = 2\n",
        )
        .unwrap();

        let (config, _) = Config::load(dir.path()).unwrap();
        assert_eq!(config.check.min_context, 2);
        assert_eq!(config.check.extensions, vec!["py", "json"]);
        assert!(config.hooks.auto_install);
    }

    #[test]
    fn test_runner_options_mapping() {
        let mut config = Config::default();
        config.check.min_context = 4;
        config.check.ignore_trailing_ws = true;
        config.check.resolver_timeout_secs = 30;

        let opts = config.runner_options();
        assert_eq!(opts.min_context, 4);
        assert!(opts.ignore_trailing_ws);
        assert_eq!(opts.resolver_timeout, Duration::from_secs(30));
    }
}
