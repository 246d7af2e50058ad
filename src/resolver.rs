//! Base-content resolvers.
//!
//! A resolver supplies the authoritative base text of a file named by a
//! patch: from a plain directory, or from a git revision via `git show`.
//! Resolvers are read-only; validation never writes through them.

use std::path::{Component, Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tracing::debug;

use crate::error::Error;

/// Read-only access to base file content.
pub trait BaseResolver: Send + Sync {
    /// Full text of the base file, or `None` when the file does not exist
    /// in the base.
    fn resolve(&self, path: &str) -> Result<Option<String>, Error>;

    /// Human description of the base, for logging and error messages.
    fn describe(&self) -> String;
}

/// Reject absolute paths and parent-directory traversal before any lookup.
fn check_path(path: &str) -> Result<(), Error> {
    let p = Path::new(path);
    if p.is_absolute() {
        return Err(Error::Resolver(format!("absolute path in patch: {path}")));
    }
    if p.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(Error::Resolver(format!(
            "path traversal in patch: {path}"
        )));
    }
    Ok(())
}

/// Resolves base content from files under a directory root.
pub struct DirResolver {
    root: PathBuf,
}

impl DirResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BaseResolver for DirResolver {
    fn resolve(&self, path: &str) -> Result<Option<String>, Error> {
        check_path(path)?;
        let full = self.root.join(path);
        match std::fs::read_to_string(&full) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Resolver(format!(
                "failed to read {}: {e}",
                full.display()
            ))),
        }
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

/// Resolves base content from a git revision via `git show <rev>:<path>`.
///
/// Paths in diffs are repository-relative, so the process must run at the
/// repository root (which is where hooks and CI steps invoke it).
pub struct GitResolver {
    revision: String,
}

impl GitResolver {
    pub fn new(revision: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
        }
    }

    /// Confirm the revision resolves before starting a run, so a typo fails
    /// once instead of once per file.
    pub fn verify(&self) -> Result<(), Error> {
        let output = Command::new("git")
            .args(["rev-parse", "--verify", "--quiet"])
            .arg(format!("{}^{{commit}}", self.revision))
            .output()
            .map_err(|e| Error::Git(format!("failed to run git: {e}")))?;
        if !output.status.success() {
            return Err(Error::Git(format!(
                "revision {:?} not found in this repository",
                self.revision
            )));
        }
        Ok(())
    }
}

impl BaseResolver for GitResolver {
    fn resolve(&self, path: &str) -> Result<Option<String>, Error> {
        check_path(path)?;
        debug!(revision = %self.revision, path, "resolving base content from git");
        let output = Command::new("git")
            .arg("show")
            .arg(format!("{}:{}", self.revision, path))
            .output()
            .map_err(|e| Error::Git(format!("failed to run git: {e}")))?;

        if output.status.success() {
            let content = String::from_utf8(output.stdout)
                .map_err(|_| Error::Resolver(format!("{path}: base content is not UTF-8")))?;
            return Ok(Some(content));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("does not exist")
            || stderr.contains("exists on disk, but not in")
            || stderr.contains("bad file")
        {
            Ok(None)
        } else {
            Err(Error::Git(format!(
                "git show {}:{} failed: {}",
                self.revision,
                path,
                stderr.trim()
            )))
        }
    }

    fn describe(&self) -> String {
        format!("git revision {}", self.revision)
    }
}

/// Build a resolver from a `--base` argument: an existing directory wins,
/// anything else is treated as a git revision and verified up front.
pub fn resolver_for_base(spec: &str) -> Result<Arc<dyn BaseResolver>, Error> {
    let path = Path::new(spec);
    if path.is_dir() {
        Ok(Arc::new(DirResolver::new(path)))
    } else {
        let resolver = GitResolver::new(spec);
        resolver.verify()?;
        Ok(Arc::new(resolver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dir_resolver_reads_content() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.py"), "line 1\nline 2\n").unwrap();

        let resolver = DirResolver::new(dir.path());
        let content = resolver.resolve("src/a.py").unwrap();
        assert_eq!(content.as_deref(), Some("line 1\nline 2\n"));
    }

    #[test]
    fn test_dir_resolver_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let resolver = DirResolver::new(dir.path());
        assert!(resolver.resolve("nope.py").unwrap().is_none());
    }

    #[test]
    fn test_resolver_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let resolver = DirResolver::new(dir.path());
        assert!(resolver.resolve("../etc/passwd").is_err());
        assert!(resolver.resolve("/etc/passwd").is_err());

        let git = GitResolver::new("HEAD");
        assert!(git.resolve("../outside.py").is_err());
    }
}
