//! Shared fakes for end-to-end audit tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;

use brew_audit::audit::{self, Collaborators, Options, RunResult};
use brew_audit::classify::KnownMisclassified;
use brew_audit::collector::{AppStore, PackageManager};
use brew_audit::report::Vcs;
use brew_audit::review::{Decision, Prompter};
use brew_audit::QueryError;

/// Installed state plus probe answers.
#[derive(Default, Clone)]
pub struct FakeBrew {
    pub formulae: BTreeSet<String>,
    pub casks: BTreeSet<String>,
    /// Names `is_formula` answers yes for, beyond `formulae`.
    pub known_formulae: BTreeSet<String>,
    pub known_casks: BTreeSet<String>,
    /// Make every probe fail as if brew could not be run.
    pub probes_fail: bool,
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

impl FakeBrew {
    pub fn new(formulae: &[&str], casks: &[&str]) -> Self {
        Self {
            formulae: set(formulae),
            casks: set(casks),
            ..Self::default()
        }
    }

    fn probe_error() -> QueryError {
        QueryError::Parse {
            program: "brew".into(),
            message: "probe disabled".into(),
        }
    }
}

impl PackageManager for FakeBrew {
    fn installed_formulae(&self) -> Result<BTreeSet<String>, QueryError> {
        Ok(self.formulae.clone())
    }
    fn installed_casks(&self) -> Result<BTreeSet<String>, QueryError> {
        Ok(self.casks.clone())
    }
    fn is_formula(&self, name: &str) -> Result<bool, QueryError> {
        if self.probes_fail {
            return Err(Self::probe_error());
        }
        Ok(self.formulae.contains(name) || self.known_formulae.contains(name))
    }
    fn is_cask(&self, name: &str) -> Result<bool, QueryError> {
        if self.probes_fail {
            return Err(Self::probe_error());
        }
        Ok(self.casks.contains(name) || self.known_casks.contains(name))
    }
}

pub struct FakeStore(pub BTreeMap<String, String>);

impl FakeStore {
    pub fn new(apps: &[(&str, &str)]) -> Self {
        Self(
            apps.iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
        )
    }
}

impl AppStore for FakeStore {
    fn installed_apps(&self) -> Result<BTreeMap<String, String>, QueryError> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
pub struct FakeVcs {
    pub diffed: RefCell<Vec<PathBuf>>,
}

impl Vcs for FakeVcs {
    fn diff(&self, path: &Path) -> Result<String, QueryError> {
        self.diffed.borrow_mut().push(path.to_path_buf());
        Ok(String::from("diff --git a/brew.sh b/brew.sh\n"))
    }
}

/// Replays a fixed list of answers; runs out as "skip".
pub struct ScriptedPrompter {
    answers: VecDeque<Decision>,
    confirm: bool,
    pub asked: Vec<String>,
    pub confirmations: usize,
}

impl ScriptedPrompter {
    pub fn new(answers: &[Decision]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            confirm: true,
            asked: Vec::new(),
            confirmations: 0,
        }
    }

    /// Answer `y` to everything.
    pub fn accept_all() -> Self {
        let mut prompter = Self::new(&[]);
        prompter.answers = std::iter::repeat(Decision::Approve).take(1000).collect();
        prompter
    }

    pub fn declining(mut self) -> Self {
        self.confirm = false;
        self
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, _section: &str, item: &str) -> Result<Decision> {
        self.asked.push(item.to_string());
        Ok(self.answers.pop_front().unwrap_or(Decision::Reject))
    }

    fn confirm(&mut self, _question: &str) -> Result<bool> {
        self.confirmations += 1;
        Ok(self.confirm)
    }
}

/// A manifest in its own temp directory.
pub struct TestRepo {
    pub temp: TempDir,
    pub manifest_path: PathBuf,
}

impl TestRepo {
    pub fn with_manifest(content: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let manifest_path = temp.path().join("brew.sh");
        fs::write(&manifest_path, content).unwrap();
        Self {
            temp,
            manifest_path,
        }
    }

    pub fn manifest(&self) -> String {
        fs::read_to_string(&self.manifest_path).unwrap()
    }

    pub fn backups(&self) -> Vec<PathBuf> {
        let mut backups: Vec<PathBuf> = fs::read_dir(self.temp.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with("brew.sh.backup."))
            })
            .collect();
        backups.sort();
        backups
    }

    pub fn run(
        &self,
        apply: bool,
        brew: &FakeBrew,
        store: Option<&FakeStore>,
        prompter: &mut ScriptedPrompter,
    ) -> RunResult {
        self.run_with_timestamp(apply, brew, store, prompter, "20240102_030405")
    }

    pub fn run_with_timestamp(
        &self,
        apply: bool,
        brew: &FakeBrew,
        store: Option<&FakeStore>,
        prompter: &mut ScriptedPrompter,
        timestamp: &str,
    ) -> RunResult {
        let vcs = FakeVcs::default();
        let options = Options {
            apply,
            timestamp: Some(timestamp.to_string()),
            ..Options::default()
        };
        audit::run(
            &self.manifest_path,
            &KnownMisclassified::builtin(),
            &options,
            Collaborators {
                brew,
                app_store: store.map(|s| s as &dyn AppStore),
                vcs: &vcs,
                prompter,
            },
        )
        .unwrap()
    }
}
