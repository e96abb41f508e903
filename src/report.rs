//! End-of-run summary.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::QueryError;
use crate::output;
use crate::review::Action;

/// Version control, used only to show what changed.
pub trait Vcs {
    fn diff(&self, path: &Path) -> Result<String, QueryError>;
}

pub struct Git {
    root: PathBuf,
}

impl Git {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Vcs for Git {
    fn diff(&self, path: &Path) -> Result<String, QueryError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(["--no-pager", "diff", "--"])
            .arg(path)
            .output()
            .map_err(|source| QueryError::Spawn {
                program: String::from("git"),
                source,
            })?;
        if !output.status.success() {
            return Err(QueryError::Failed {
                program: String::from("git diff"),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub moved: usize,
    pub added: usize,
    pub removed: usize,
}

impl Counts {
    pub fn of(actions: &[Action]) -> Self {
        actions.iter().fold(Self::default(), |mut counts, action| {
            match action {
                Action::Move { .. } => counts.moved += 1,
                Action::Add { .. } => counts.added += 1,
                Action::Remove { .. } => counts.removed += 1,
            }
            counts
        })
    }
}

fn print_counts(counts: Counts) {
    println!("  - Added: {} entries", counts.added);
    println!("  - Removed: {} entries", counts.removed);
    println!("  - Moved: {} entries", counts.moved);
}

pub fn report_dry_run(actions: &[Action]) {
    println!();
    output::info("Dry run complete");
    print_counts(Counts::of(actions));
    output::info("No files were modified. Re-run with --apply to write these changes.");
}

pub fn report_applied(actions: &[Action], manifest_path: &Path, backup: &Path, vcs: &dyn Vcs) {
    println!();
    output::success(&format!("Updated {}", manifest_path.display()));
    print_counts(Counts::of(actions));
    output::info(&format!("Backup saved to {}", backup.display()));

    match vcs.diff(manifest_path) {
        Ok(diff) if diff.trim().is_empty() => output::info("git reports no textual changes"),
        Ok(diff) => {
            println!();
            print!("{}", diff);
        }
        Err(e) => output::warn(&format!("Could not show diff: {}", e)),
    }

    println!();
    println!("Next steps:");
    println!("  - Review the diff above");
    println!("  - Commit the manifest: git commit {}", manifest_path.display());
    println!("  - Delete the backup once you are happy: rm {}", backup.display());
}
