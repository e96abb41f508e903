//! `--scan-apps`: application bundles on disk that nothing manages.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::collector::InstalledState;
use crate::manifest::Manifest;

/// `"Visual Studio Code.app"` → `"visual-studio-code"`.
pub fn normalize_bundle_name(name: &str) -> String {
    let stem = name.strip_suffix(".app").unwrap_or(name);
    stem.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Bundle names (without `.app`) directly inside `dir`, sorted.
pub fn find_bundles(dir: &Path) -> Vec<String> {
    let mut bundles: Vec<String> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "app"))
        .filter_map(|entry| {
            entry
                .path()
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .collect();
    bundles.sort();
    bundles
}

/// Bundles in `dir` that match no `apps` entry, installed cask, or App Store
/// app name.
pub fn unmanaged_bundles(
    dir: &Path,
    manifest: &Manifest,
    installed: &InstalledState,
) -> Vec<String> {
    let mut managed: HashSet<String> = manifest
        .apps
        .ids()
        .chain(installed.casks.iter().map(String::as_str))
        .map(normalize_bundle_name)
        .collect();
    managed.extend(
        manifest
            .app_store
            .entries
            .iter()
            .filter_map(|entry| entry.comment.as_deref())
            .map(normalize_bundle_name),
    );
    if let Some(store) = &installed.app_store {
        managed.extend(store.values().map(|name| normalize_bundle_name(name)));
    }

    find_bundles(dir)
        .into_iter()
        .filter(|bundle| !managed.contains(&normalize_bundle_name(bundle)))
        .collect()
}
