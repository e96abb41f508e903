use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Optional user settings, read from `config.toml`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Manifest file name, relative to the repository root.
    pub manifest: String,
    pub brew: String,
    pub mas: String,
    /// Directory searched by `--scan-apps`.
    pub applications_dir: PathBuf,
    /// Identifiers treated as GUI applications when listed under `packages`,
    /// in addition to the built-in set.
    pub known_misclassified: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            manifest: String::from("brew.sh"),
            brew: String::from("brew"),
            mas: String::from("mas"),
            applications_dir: PathBuf::from("/Applications"),
            known_misclassified: Vec::new(),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("brew-audit").join("config.toml"))
}

impl AuditConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML config")
    }

    /// Load `explicit` if given (it must exist), otherwise the default
    /// location if a file is there, otherwise built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.is_file() => path,
                _ => {
                    debug!("no config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(AuditConfig::from_toml("").unwrap(), AuditConfig::default());
    }

    #[test]
    fn test_partial_config_overrides() {
        let config = AuditConfig::from_toml(
            r#"
manifest = "Brewfile.sh"
known_misclassified = ["wezterm"]
"#,
        )
        .unwrap();
        assert_eq!(config.manifest, "Brewfile.sh");
        assert_eq!(config.known_misclassified, vec!["wezterm".to_string()]);
        assert_eq!(config.brew, "brew");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(AuditConfig::from_toml("manifest_path = \"x\"").is_err());
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AuditConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
