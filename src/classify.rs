//! Deciding whether each name-list entry is a formula or a cask.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::collector::PackageManager;
use crate::manifest::{ListKind, Manifest};
use crate::output;

/// Casks that have historically ended up under `packages`. Only names with no
/// formula of the same name belong here, otherwise a correctly filed formula
/// would be moved to `apps` and back on alternate runs.
pub const KNOWN_GUI_APPS: &[&str] = &[
    "1password",
    "alacritty",
    "alfred",
    "discord",
    "firefox",
    "ghostty",
    "iterm2",
    "kitty",
    "obsidian",
    "raycast",
    "rectangle",
    "slack",
    "spotify",
    "visual-studio-code",
    "vlc",
    "wezterm",
    "zoom",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Formula,
    Cask,
    Unresolvable,
}

#[derive(Debug, Clone, Default)]
pub struct KnownMisclassified {
    names: HashSet<String>,
}

impl KnownMisclassified {
    pub fn builtin() -> Self {
        Self {
            names: KNOWN_GUI_APPS.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(extra.into_iter().map(Into::into));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// An entry filed under the wrong name list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Misclassification {
    pub entry: String,
    pub from: ListKind,
    pub to: ListKind,
    /// Found through the known list rather than a live query.
    pub known: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ClassificationResult {
    pub packages: BTreeMap<String, Classification>,
    pub apps: BTreeMap<String, Classification>,
    pub moves: Vec<Misclassification>,
}

impl ClassificationResult {
    pub fn tag(&self, list: ListKind, id: &str) -> Option<Classification> {
        match list {
            ListKind::Packages => self.packages.get(id).copied(),
            ListKind::Apps => self.apps.get(id).copied(),
            ListKind::AppStore => None,
        }
    }

    /// Entries whose move target is `list`.
    pub fn moving_into(&self, list: ListKind) -> impl Iterator<Item = &str> {
        self.moves
            .iter()
            .filter(move |m| m.to == list)
            .map(|m| m.entry.as_str())
    }

    pub fn unresolved(&self) -> impl Iterator<Item = (ListKind, &str)> {
        let packages = self
            .packages
            .iter()
            .filter(|(_, tag)| **tag == Classification::Unresolvable)
            .map(|(id, _)| (ListKind::Packages, id.as_str()));
        let apps = self
            .apps
            .iter()
            .filter(|(_, tag)| **tag == Classification::Unresolvable)
            .map(|(id, _)| (ListKind::Apps, id.as_str()));
        packages.chain(apps)
    }
}

/// Ask the package manager what `name` is, trying the kind implied by the
/// list it was found in first.
pub fn probe(brew: &dyn PackageManager, name: &str, declared: ListKind) -> Classification {
    let order = match declared {
        ListKind::Apps => [Classification::Cask, Classification::Formula],
        _ => [Classification::Formula, Classification::Cask],
    };

    for candidate in order {
        let answer = match candidate {
            Classification::Formula => brew.is_formula(name),
            _ => brew.is_cask(name),
        };
        match answer {
            Ok(true) => return candidate,
            Ok(false) => debug!(name, ?candidate, "probe answered no"),
            Err(e) => debug!(name, ?candidate, error = %e, "probe failed"),
        }
    }
    Classification::Unresolvable
}

pub fn classify(
    manifest: &Manifest,
    brew: &dyn PackageManager,
    known: &KnownMisclassified,
) -> ClassificationResult {
    let mut result = ClassificationResult::default();

    for name in manifest.packages.ids() {
        if result.packages.contains_key(name) {
            continue;
        }
        let tag = if known.contains(name) {
            debug!(name, "known cask listed under packages");
            result.moves.push(Misclassification {
                entry: name.to_string(),
                from: ListKind::Packages,
                to: ListKind::Apps,
                known: true,
            });
            Classification::Cask
        } else {
            let tag = probe(brew, name, ListKind::Packages);
            if tag == Classification::Cask {
                result.moves.push(Misclassification {
                    entry: name.to_string(),
                    from: ListKind::Packages,
                    to: ListKind::Apps,
                    known: false,
                });
            }
            tag
        };
        result.packages.insert(name.to_string(), tag);
    }

    for name in manifest.apps.ids() {
        if result.apps.contains_key(name) {
            continue;
        }
        let tag = probe(brew, name, ListKind::Apps);
        if tag == Classification::Formula {
            result.moves.push(Misclassification {
                entry: name.to_string(),
                from: ListKind::Apps,
                to: ListKind::Packages,
                known: false,
            });
        }
        result.apps.insert(name.to_string(), tag);
    }

    for (list, name) in result.unresolved() {
        output::warn(&format!(
            "'{}' in {} is neither a known formula nor a cask; leaving it in place",
            name, list
        ));
    }

    result
}
