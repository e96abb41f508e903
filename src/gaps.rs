//! Installed-but-unlisted ("missing") and listed-but-not-installed ("extra")
//! entries, per list.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::classify::{Classification, ClassificationResult};
use crate::collector::InstalledState;
use crate::manifest::{Entry, ListKind, Lists, ManagedList, Manifest};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapResult {
    pub missing: Lists,
    pub extra: Lists,
}

impl GapResult {
    pub fn total(&self) -> usize {
        ListKind::ALL
            .iter()
            .map(|kind| self.missing.get(*kind).len() + self.extra.get(*kind).len())
            .sum()
    }
}

/// Installed names absent from `list`. Entries already proposed for a move
/// into `list` are left to the move.
fn missing_names(
    installed: &BTreeSet<String>,
    list: &ManagedList,
    classification: &ClassificationResult,
) -> Vec<Entry> {
    let listed: HashSet<&str> = list.ids().collect();
    let incoming: HashSet<&str> = classification.moving_into(list.kind).collect();
    installed
        .iter()
        .filter(|name| !listed.contains(name.as_str()) && !incoming.contains(name.as_str()))
        .map(|name| Entry::new(name.as_str()))
        .collect()
}

/// Listed names that are not installed. Entries classified as the other kind
/// are handled by their move and are not offered for removal.
fn extra_names(
    installed: &BTreeSet<String>,
    list: &ManagedList,
    classification: &ClassificationResult,
    other_kind: Classification,
) -> Vec<Entry> {
    let mut seen = HashSet::new();
    list.ids()
        .filter(|name| seen.insert(*name))
        .filter(|name| classification.tag(list.kind, name) != Some(other_kind))
        .filter(|name| !installed.contains(*name))
        .map(Entry::new)
        .collect()
}

pub fn analyze(
    manifest: &Manifest,
    installed: &InstalledState,
    classification: &ClassificationResult,
) -> GapResult {
    let mut result = GapResult {
        missing: Lists {
            packages: missing_names(&installed.formulae, &manifest.packages, classification),
            apps: missing_names(&installed.casks, &manifest.apps, classification),
            app_store: Vec::new(),
        },
        extra: Lists {
            packages: extra_names(
                &installed.formulae,
                &manifest.packages,
                classification,
                Classification::Cask,
            ),
            apps: extra_names(
                &installed.casks,
                &manifest.apps,
                classification,
                Classification::Formula,
            ),
            app_store: Vec::new(),
        },
    };

    if let Some(store) = &installed.app_store {
        result.missing.app_store = store
            .iter()
            .filter(|(id, _)| !manifest.app_store.contains(id))
            .map(|(id, name)| Entry::with_comment(id.as_str(), name.as_str()))
            .collect();

        let mut seen = HashSet::new();
        result.extra.app_store = manifest
            .app_store
            .entries
            .iter()
            .filter(|entry| seen.insert(entry.id.as_str()))
            .filter(|entry| !store.contains_key(&entry.id))
            .cloned()
            .collect();
    }

    for kind in ListKind::ALL {
        debug!(
            list = %kind,
            missing = result.missing.get(kind).len(),
            extra = result.extra.get(kind).len(),
            "gap analysis"
        );
    }
    result
}
