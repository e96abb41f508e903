//! One full audit: parse, collect, classify, analyze, review, write, report.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::classify::{self, KnownMisclassified};
use crate::collector::{self, AppStore, PackageManager};
use crate::gaps;
use crate::manifest::Manifest;
use crate::mutate;
use crate::output;
use crate::report::{self, Vcs};
use crate::review::{self, Action, Prompter, ReviewOutcome};
use crate::scan;

#[derive(Debug, Clone)]
pub struct Options {
    /// Write the manifest. Without it the run is a preview.
    pub apply: bool,
    pub scan_apps: bool,
    pub applications_dir: PathBuf,
    /// Backup suffix; the current local time when `None`.
    pub timestamp: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            apply: false,
            scan_apps: false,
            applications_dir: PathBuf::from("/Applications"),
            timestamp: None,
        }
    }
}

pub struct Collaborators<'a> {
    pub brew: &'a dyn PackageManager,
    pub app_store: Option<&'a dyn AppStore>,
    pub vcs: &'a dyn Vcs,
    pub prompter: &'a mut dyn Prompter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    NoChanges,
    NothingAccepted,
    Aborted,
    Declined,
    DryRun(Vec<Action>),
    Applied { actions: Vec<Action>, backup: PathBuf },
}

pub fn run(
    manifest_path: &Path,
    known: &KnownMisclassified,
    options: &Options,
    collab: Collaborators<'_>,
) -> Result<RunResult> {
    output::info(&format!("Reading {}", manifest_path.display()));
    let manifest = Manifest::load(manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;
    output::info(&format!(
        "Manifest lists {} packages, {} apps, {} App Store apps",
        manifest.packages.entries.len(),
        manifest.apps.entries.len(),
        manifest.app_store.entries.len()
    ));

    let installed = collector::collect(collab.brew, collab.app_store)
        .context("Failed to collect installed state")?;

    output::info("Classifying manifest entries...");
    let classification = classify::classify(&manifest, collab.brew, known);
    let gaps = gaps::analyze(&manifest, &installed, &classification);

    if options.scan_apps {
        let unmanaged = scan::unmanaged_bundles(&options.applications_dir, &manifest, &installed);
        if unmanaged.is_empty() {
            output::info(&format!(
                "Every bundle in {} is managed",
                options.applications_dir.display()
            ));
        } else {
            output::warn(&format!(
                "{} application bundle(s) in {} are not managed by Homebrew or the App Store:",
                unmanaged.len(),
                options.applications_dir.display()
            ));
            for bundle in &unmanaged {
                println!("  - {}.app", bundle);
            }
        }
    }

    let outcome = review::review(&classification, &gaps, options.apply, collab.prompter)?;
    let actions = match outcome {
        ReviewOutcome::NoChanges => {
            output::success("No changes needed: the manifest matches what is installed");
            return Ok(RunResult::NoChanges);
        }
        ReviewOutcome::NothingAccepted => {
            output::info("No changes accepted");
            return Ok(RunResult::NothingAccepted);
        }
        ReviewOutcome::Aborted => {
            println!();
            output::info("Aborted. The manifest was not modified.");
            return Ok(RunResult::Aborted);
        }
        ReviewOutcome::Declined(actions) => {
            output::info(&format!(
                "Cancelled. {} accepted change(s) discarded; the manifest was not modified.",
                actions.len()
            ));
            return Ok(RunResult::Declined);
        }
        ReviewOutcome::Accepted(actions) => actions,
    };

    if !options.apply {
        report::report_dry_run(&actions);
        return Ok(RunResult::DryRun(actions));
    }

    let timestamp = options.timestamp.clone().unwrap_or_else(mutate::timestamp_now);
    let backup = mutate::commit(manifest_path, &manifest, &actions, &timestamp)
        .with_context(|| format!("Failed to update {}", manifest_path.display()))?;
    report::report_applied(&actions, manifest_path, &backup, collab.vcs);
    Ok(RunResult::Applied { actions, backup })
}
