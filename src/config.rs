use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::domain::BranchKind;
use crate::error::{ConfigError, Result};

/// File-level configuration for gitflow-guard.
///
/// Every field has a default, so an empty or missing file is valid. Call
/// [`Config::validate`] to obtain the immutable [`Configuration`] the engine uses.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub branches: BranchesConfig,

    #[serde(default)]
    pub prefixes: PrefixesConfig,

    #[serde(default)]
    pub tags: TagsConfig,

    #[serde(default)]
    pub port: PortConfig,
}

fn default_main_branch() -> String {
    "main".to_string()
}

fn default_develop_branch() -> String {
    "develop".to_string()
}

/// Names of the two long-lived branches.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BranchesConfig {
    #[serde(default = "default_main_branch")]
    pub main: String,

    #[serde(default = "default_develop_branch")]
    pub develop: String,
}

impl Default for BranchesConfig {
    fn default() -> Self {
        BranchesConfig {
            main: default_main_branch(),
            develop: default_develop_branch(),
        }
    }
}

fn default_feature_prefix() -> String {
    "feature/".to_string()
}

fn default_bugfix_prefix() -> String {
    "bugfix/".to_string()
}

fn default_release_prefix() -> String {
    "release/".to_string()
}

fn default_hotfix_prefix() -> String {
    "hotfix/".to_string()
}

fn default_support_prefix() -> String {
    "support/".to_string()
}

/// Prefixes of the short-lived branch types. An empty prefix disables the type.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PrefixesConfig {
    #[serde(default = "default_feature_prefix")]
    pub feature: String,

    #[serde(default = "default_bugfix_prefix")]
    pub bugfix: String,

    #[serde(default = "default_release_prefix")]
    pub release: String,

    #[serde(default = "default_hotfix_prefix")]
    pub hotfix: String,

    #[serde(default = "default_support_prefix")]
    pub support: String,
}

impl Default for PrefixesConfig {
    fn default() -> Self {
        PrefixesConfig {
            feature: default_feature_prefix(),
            bugfix: default_bugfix_prefix(),
            release: default_release_prefix(),
            hotfix: default_hotfix_prefix(),
            support: default_support_prefix(),
        }
    }
}

impl PrefixesConfig {
    fn get(&self, kind: BranchKind) -> Option<&str> {
        match kind {
            BranchKind::Feature => Some(&self.feature),
            BranchKind::Bugfix => Some(&self.bugfix),
            BranchKind::Release => Some(&self.release),
            BranchKind::Hotfix => Some(&self.hotfix),
            BranchKind::Support => Some(&self.support),
            _ => None,
        }
    }
}

/// Formatting of created version tags.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct TagsConfig {
    #[serde(default)]
    pub version_prefix: String,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Limits applied to version-control calls.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PortConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PortConfig {
    fn default() -> Self {
        PortConfig {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Values supplied on the command line. `None` keeps the file or default value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub main_branch: Option<String>,
    pub develop_branch: Option<String>,
    pub feature_prefix: Option<String>,
    pub bugfix_prefix: Option<String>,
    pub release_prefix: Option<String>,
    pub hotfix_prefix: Option<String>,
    pub support_prefix: Option<String>,
    pub version_tag_prefix: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Apply command-line overrides on top of this configuration.
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        fn set(field: &mut String, value: &Option<String>) {
            if let Some(value) = value {
                *field = value.clone();
            }
        }

        set(&mut self.branches.main, &overrides.main_branch);
        set(&mut self.branches.develop, &overrides.develop_branch);
        set(&mut self.prefixes.feature, &overrides.feature_prefix);
        set(&mut self.prefixes.bugfix, &overrides.bugfix_prefix);
        set(&mut self.prefixes.release, &overrides.release_prefix);
        set(&mut self.prefixes.hotfix, &overrides.hotfix_prefix);
        set(&mut self.prefixes.support, &overrides.support_prefix);
        set(&mut self.tags.version_prefix, &overrides.version_tag_prefix);
        if let Some(timeout) = overrides.timeout_secs {
            self.port.timeout_secs = timeout;
        }
        self
    }

    /// Check the invariants classification relies on and freeze the result.
    ///
    /// Enabled prefixes must be pairwise distinct and none may be a prefix of
    /// another, otherwise a branch name could match two roles.
    pub fn validate(&self) -> std::result::Result<Configuration, ConfigError> {
        if self.branches.main.is_empty() {
            return Err(ConfigError::EmptyBranchName { role: "main" });
        }
        if self.branches.develop.is_empty() {
            return Err(ConfigError::EmptyBranchName { role: "develop" });
        }
        if self.branches.main == self.branches.develop {
            return Err(ConfigError::DuplicateBranchName(self.branches.main.clone()));
        }
        if self.port.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let prefixes: Vec<(BranchKind, String)> = BranchKind::PREFIXED
            .iter()
            .filter_map(|&kind| {
                self.prefixes
                    .get(kind)
                    .filter(|p| !p.is_empty())
                    .map(|p| (kind, p.to_string()))
            })
            .collect();

        for (i, (first, a)) in prefixes.iter().enumerate() {
            for (second, b) in &prefixes[i + 1..] {
                if a == b {
                    return Err(ConfigError::DuplicatePrefix {
                        prefix: a.clone(),
                        first: *first,
                        second: *second,
                    });
                }
                let overlap = if b.starts_with(a.as_str()) {
                    Some(((*first, a), (*second, b)))
                } else if a.starts_with(b.as_str()) {
                    Some(((*second, b), (*first, a)))
                } else {
                    None
                };
                if let Some(((shorter, shorter_prefix), (longer, longer_prefix))) = overlap {
                    return Err(ConfigError::OverlappingPrefix {
                        shorter,
                        shorter_prefix: shorter_prefix.clone(),
                        longer,
                        longer_prefix: longer_prefix.clone(),
                    });
                }
            }
        }

        Ok(Configuration {
            main_branch: self.branches.main.clone(),
            develop_branch: self.branches.develop.clone(),
            prefixes,
            version_tag_prefix: self.tags.version_prefix.clone(),
            timeout: Duration::from_secs(self.port.timeout_secs),
        })
    }
}

/// Validated, immutable configuration consumed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    main_branch: String,
    develop_branch: String,
    prefixes: Vec<(BranchKind, String)>,
    version_tag_prefix: String,
    timeout: Duration,
}

impl Configuration {
    pub fn main_branch(&self) -> &str {
        &self.main_branch
    }

    pub fn develop_branch(&self) -> &str {
        &self.develop_branch
    }

    /// Prefix for a branch kind, or `None` when the kind has no prefix or is disabled
    pub fn prefix(&self, kind: BranchKind) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, p)| p.as_str())
    }

    pub fn version_tag_prefix(&self) -> &str {
        &self.version_tag_prefix
    }

    /// Upper bound for every version-control call
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitflow.toml` in current directory
/// 3. `.gitflow.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If a file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)?
    } else if Path::new("./gitflow.toml").exists() {
        fs::read_to_string("./gitflow.toml")?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(".gitflow.toml");
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    let config: Config = toml::from_str(&config_str)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = Config::default().validate().unwrap();
        assert_eq!(cfg.main_branch(), "main");
        assert_eq!(cfg.develop_branch(), "develop");
        assert_eq!(cfg.prefix(BranchKind::Feature), Some("feature/"));
        assert_eq!(cfg.prefix(BranchKind::Support), Some("support/"));
        assert_eq!(cfg.prefix(BranchKind::Main), None);
        assert_eq!(cfg.version_tag_prefix(), "");
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_duplicate_prefix_rejected() {
        let mut config = Config::default();
        config.prefixes.bugfix = "feature/".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicatePrefix {
                prefix: "feature/".to_string(),
                first: BranchKind::Feature,
                second: BranchKind::Bugfix,
            })
        );
    }

    #[test]
    fn test_overlapping_prefix_rejected_in_either_order() {
        let mut config = Config::default();
        config.prefixes.feature = "fix".to_string();
        config.prefixes.bugfix = "fix/".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OverlappingPrefix {
                shorter: BranchKind::Feature,
                longer: BranchKind::Bugfix,
                ..
            })
        ));

        let mut config = Config::default();
        config.prefixes.feature = "rel/x/".to_string();
        config.prefixes.release = "rel/".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OverlappingPrefix {
                shorter: BranchKind::Release,
                longer: BranchKind::Feature,
                ..
            })
        ));
    }

    #[test]
    fn test_empty_prefix_disables_type() {
        let mut config = Config::default();
        config.prefixes.support = String::new();
        config.prefixes.bugfix = String::new();
        let cfg = config.validate().unwrap();
        assert_eq!(cfg.prefix(BranchKind::Support), None);
        assert_eq!(cfg.prefix(BranchKind::Bugfix), None);
    }

    #[test]
    fn test_branch_names_checked() {
        let mut config = Config::default();
        config.branches.develop = "main".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateBranchName("main".to_string()))
        );

        let mut config = Config::default();
        config.branches.main = String::new();
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyBranchName { role: "main" })
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.port.timeout_secs = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTimeout));
    }

    #[test]
    fn test_overrides_replace_only_supplied_values() {
        let overrides = ConfigOverrides {
            main_branch: Some("master".to_string()),
            version_tag_prefix: Some("v".to_string()),
            timeout_secs: Some(5),
            ..ConfigOverrides::default()
        };
        let config = Config::default().with_overrides(&overrides);

        assert_eq!(config.branches.main, "master");
        assert_eq!(config.branches.develop, "develop");
        assert_eq!(config.prefixes.release, "release/");
        assert_eq!(config.tags.version_prefix, "v");
        assert_eq!(config.port.timeout_secs, 5);
    }
}
