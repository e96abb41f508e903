//! Applying accepted actions and rewriting the manifest.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::cleanup::TempGuard;
use crate::error::AuditError;
use crate::manifest::{Entry, ListKind, Lists, Manifest};
use crate::review::Action;

/// Apply `actions` in order to a copy of `lists`, then dedup and sort.
pub fn apply_actions(lists: &Lists, actions: &[Action]) -> Lists {
    let mut working = lists.clone();
    for action in actions {
        match action {
            Action::Move { entry, from, to } => {
                let source = working.get_mut(*from);
                let moved = source
                    .iter()
                    .position(|e| &e.id == entry)
                    .map(|idx| source.remove(idx))
                    .unwrap_or_else(|| Entry::new(entry.as_str()));
                source.retain(|e| &e.id != entry);
                working.get_mut(*to).push(moved);
            }
            Action::Add {
                entry,
                list,
                comment,
            } => working.get_mut(*list).push(Entry {
                id: entry.clone(),
                comment: comment.clone(),
            }),
            Action::Remove { entry, list } => working.get_mut(*list).retain(|e| &e.id != entry),
        }
    }
    canonicalize(&mut working);
    working
}

/// Unique entries per list, name lists in byte order, `app_store` by display
/// name ignoring case.
pub fn canonicalize(lists: &mut Lists) {
    for kind in [ListKind::Packages, ListKind::Apps] {
        let list = lists.get_mut(kind);
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list.dedup_by(|a, b| a.id == b.id);
    }

    let store = &mut lists.app_store;
    let mut seen = HashSet::new();
    store.retain(|e| seen.insert(e.id.clone()));
    store.sort_by_cached_key(|e| {
        let name = e.comment.as_deref().unwrap_or(&e.id).to_lowercase();
        (name, e.id.clone())
    });
}

pub fn timestamp_now() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// `<manifest>.backup.<timestamp>` next to the manifest.
pub fn backup_path(manifest_path: &Path, timestamp: &str) -> PathBuf {
    let name = manifest_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("manifest"));
    manifest_path.with_file_name(format!("{}.backup.{}", name, timestamp))
}

/// Replace `path` with `contents` via a temp file in the same directory.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), AuditError> {
    let rewrite_err = |source: std::io::Error| AuditError::Rewrite {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(rewrite_err)?;
    let _guard = TempGuard::register(tmp.path());
    debug!(tmp = %tmp.path().display(), "writing manifest");

    tmp.write_all(contents.as_bytes()).map_err(rewrite_err)?;
    tmp.as_file().sync_all().map_err(rewrite_err)?;
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), metadata.permissions()).map_err(rewrite_err)?;
    }
    tmp.persist(path).map_err(|e| rewrite_err(e.error))?;
    Ok(())
}

/// Back up `manifest_path`, then write the manifest with `actions` applied.
/// Returns the backup path.
pub fn commit(
    manifest_path: &Path,
    manifest: &Manifest,
    actions: &[Action],
    timestamp: &str,
) -> Result<PathBuf, AuditError> {
    let backup = backup_path(manifest_path, timestamp);
    fs::copy(manifest_path, &backup).map_err(|source| AuditError::Backup {
        path: backup.clone(),
        source,
    })?;
    debug!(backup = %backup.display(), "backup written");

    let lists = apply_actions(&manifest.lists(), actions);
    write_atomic(manifest_path, &manifest.render(&lists))?;
    Ok(backup)
}
