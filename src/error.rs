use std::path::PathBuf;

use thiserror::Error;

use crate::manifest::ListKind;

/// Failure of an external collaborator invocation (`brew`, `mas`, `git`).
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("could not parse output of {program}: {message}")]
    Parse { program: String, message: String },
}

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("not inside a git repository (run from your dotfiles checkout)")]
    NotARepository,
    #[error("manifest not found: {}", .0.display())]
    ManifestMissing(PathBuf),
    #[error("manifest is not readable: {}: {source}", .path.display())]
    ManifestUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("`{0}` was not found on PATH; install Homebrew first")]
    PackageManagerMissing(String),
    #[error("`{list}=(` opened on line {line} is never closed")]
    UnterminatedBlock { list: ListKind, line: usize },
    #[error("failed to write backup {}: {source}", .path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to rewrite {}: {source}", .path.display())]
    Rewrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Query(#[from] QueryError),
}
