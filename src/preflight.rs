//! Checks that must pass before anything is collected.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::output;

#[derive(Debug, Clone)]
pub struct Environment {
    pub root: PathBuf,
    pub manifest_path: PathBuf,
    pub brew: PathBuf,
    /// `None` when `mas` is not installed.
    pub mas: Option<PathBuf>,
}

/// Top-level directory of the git checkout containing `cwd`.
pub fn repo_root(cwd: &Path) -> Result<PathBuf, AuditError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(cwd)
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .map_err(|_| AuditError::NotARepository)?;
    if !output.status.success() {
        return Err(AuditError::NotARepository);
    }
    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if root.is_empty() {
        return Err(AuditError::NotARepository);
    }
    Ok(PathBuf::from(root))
}

/// The manifest must be a readable file.
pub fn check_manifest(path: &Path) -> Result<(), AuditError> {
    if !path.is_file() {
        return Err(AuditError::ManifestMissing(path.to_path_buf()));
    }
    File::open(path).map_err(|source| AuditError::ManifestUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

pub fn validate(cwd: &Path, config: &AuditConfig) -> Result<Environment, AuditError> {
    let root = repo_root(cwd)?;
    debug!(root = %root.display(), "repository root");

    let manifest_path = root.join(&config.manifest);
    check_manifest(&manifest_path)?;

    let brew = which::which(&config.brew)
        .map_err(|_| AuditError::PackageManagerMissing(config.brew.clone()))?;
    debug!(brew = %brew.display(), "package manager");

    let mas = match which::which(&config.mas) {
        Ok(path) => Some(path),
        Err(_) => {
            output::warn(&format!(
                "`{}` not found; App Store apps will not be checked (brew install mas)",
                config.mas
            ));
            None
        }
    };

    Ok(Environment {
        root,
        manifest_path,
        brew,
        mas,
    })
}
