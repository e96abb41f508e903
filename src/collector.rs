//! What is actually installed, according to Homebrew and `mas`.

use std::collections::{BTreeMap, BTreeSet};
use std::process::{Command, Output};
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::{AuditError, QueryError};
use crate::output;

/// Package manager queries.
///
/// The probes answer `Ok(false)` when the tool ran and said no, and `Err`
/// only when the tool itself could not be asked.
pub trait PackageManager {
    /// Formulae the user asked for, not their dependencies.
    fn installed_formulae(&self) -> Result<BTreeSet<String>, QueryError>;
    fn installed_casks(&self) -> Result<BTreeSet<String>, QueryError>;
    fn is_formula(&self, name: &str) -> Result<bool, QueryError>;
    fn is_cask(&self, name: &str) -> Result<bool, QueryError>;
}

pub trait AppStore {
    /// Installed app identifiers mapped to display names.
    fn installed_apps(&self) -> Result<BTreeMap<String, String>, QueryError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledState {
    pub formulae: BTreeSet<String>,
    pub casks: BTreeSet<String>,
    /// `None` when the App Store client is unavailable.
    pub app_store: Option<BTreeMap<String, String>>,
}

pub fn collect(
    brew: &dyn PackageManager,
    store: Option<&dyn AppStore>,
) -> Result<InstalledState, AuditError> {
    output::info("Collecting installed formulae...");
    let formulae = brew.installed_formulae()?;
    debug!(count = formulae.len(), "explicit formulae");

    output::info("Collecting installed casks...");
    let casks = brew.installed_casks()?;
    debug!(count = casks.len(), "casks");

    let app_store = match store {
        Some(store) => {
            output::info("Collecting App Store apps...");
            match store.installed_apps() {
                Ok(apps) => {
                    debug!(count = apps.len(), "app store apps");
                    Some(apps)
                }
                Err(e) => {
                    output::warn(&format!(
                        "App Store query failed, skipping App Store apps: {}",
                        e
                    ));
                    None
                }
            }
        }
        None => None,
    };

    Ok(InstalledState {
        formulae,
        casks,
        app_store,
    })
}

fn run(program: &str, args: &[&str]) -> Result<Output, QueryError> {
    debug!(program, ?args, "running");
    Command::new(program)
        .args(args)
        .output()
        .map_err(|source| QueryError::Spawn {
            program: program.to_string(),
            source,
        })
}

fn run_checked(program: &str, args: &[&str]) -> Result<String, QueryError> {
    let output = run(program, args)?;
    if !output.status.success() {
        return Err(QueryError::Failed {
            program: format!("{} {}", program, args.join(" ")),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Homebrew, driven through its CLI.
#[derive(Debug, Clone)]
pub struct Homebrew {
    program: String,
}

impl Homebrew {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[derive(Deserialize)]
struct BrewInfo {
    #[serde(default)]
    formulae: Vec<FormulaInfo>,
}

#[derive(Deserialize)]
struct FormulaInfo {
    name: String,
    #[serde(default)]
    installed: Vec<KegInfo>,
}

#[derive(Deserialize)]
struct KegInfo {
    #[serde(default)]
    installed_on_request: bool,
}

/// Names of formulae with at least one keg installed on request, from
/// `brew info --json=v2 --installed`.
pub fn parse_formulae_json(json: &str) -> Result<BTreeSet<String>, QueryError> {
    let info: BrewInfo = serde_json::from_str(json).map_err(|e| QueryError::Parse {
        program: String::from("brew info --json=v2"),
        message: e.to_string(),
    })?;
    Ok(info
        .formulae
        .into_iter()
        .filter(|formula| formula.installed.iter().any(|keg| keg.installed_on_request))
        .map(|formula| formula.name)
        .collect())
}

fn parse_lines(stdout: &str) -> BTreeSet<String> {
    stdout
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

impl PackageManager for Homebrew {
    fn installed_formulae(&self) -> Result<BTreeSet<String>, QueryError> {
        let stdout = run_checked(&self.program, &["info", "--json=v2", "--installed"])?;
        parse_formulae_json(&stdout)
    }

    fn installed_casks(&self) -> Result<BTreeSet<String>, QueryError> {
        let stdout = run_checked(&self.program, &["list", "--cask", "-1"])?;
        Ok(parse_lines(&stdout))
    }

    fn is_formula(&self, name: &str) -> Result<bool, QueryError> {
        Ok(run(&self.program, &["info", "--formula", name])?.status.success())
    }

    fn is_cask(&self, name: &str) -> Result<bool, QueryError> {
        Ok(run(&self.program, &["info", "--cask", name])?.status.success())
    }
}

/// The `mas` App Store client.
#[derive(Debug, Clone)]
pub struct Mas {
    program: String,
}

impl Mas {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

fn mas_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d+)\s+(.+?)(?:\s+\([^()]*\))?\s*$").expect("valid regex")
    })
}

/// Parse `mas list` output: `<id>  <name>  (<version>)` per line.
pub fn parse_mas_list(stdout: &str) -> BTreeMap<String, String> {
    stdout
        .lines()
        .filter_map(|line| mas_line_re().captures(line))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

impl AppStore for Mas {
    fn installed_apps(&self) -> Result<BTreeMap<String, String>, QueryError> {
        let stdout = run_checked(&self.program, &["list"])?;
        Ok(parse_mas_list(&stdout))
    }
}
