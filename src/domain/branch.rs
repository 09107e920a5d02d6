//! Branch taxonomy: maps a branch name onto its GitFlow role.

use std::fmt;

use crate::config::Configuration;
use crate::error::ClassificationError;

/// The GitFlow role of a branch, without its suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BranchKind {
    Main,
    Develop,
    Feature,
    Bugfix,
    Release,
    Hotfix,
    Support,
    Unknown,
}

impl BranchKind {
    /// Every kind, in declaration order.
    pub const ALL: [BranchKind; 8] = [
        BranchKind::Main,
        BranchKind::Develop,
        BranchKind::Feature,
        BranchKind::Bugfix,
        BranchKind::Release,
        BranchKind::Hotfix,
        BranchKind::Support,
        BranchKind::Unknown,
    ];

    /// The five kinds identified by a configured prefix.
    pub const PREFIXED: [BranchKind; 5] = [
        BranchKind::Feature,
        BranchKind::Bugfix,
        BranchKind::Release,
        BranchKind::Hotfix,
        BranchKind::Support,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BranchKind::Main => "main",
            BranchKind::Develop => "develop",
            BranchKind::Feature => "feature",
            BranchKind::Bugfix => "bugfix",
            BranchKind::Release => "release",
            BranchKind::Hotfix => "hotfix",
            BranchKind::Support => "support",
            BranchKind::Unknown => "unknown",
        }
    }

    /// Whether branches of this kind carry a suffix after their prefix
    pub fn is_prefixed(&self) -> bool {
        Self::PREFIXED.contains(self)
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A classified branch. Prefixed roles keep the text after their prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BranchRole {
    Main,
    Develop,
    Feature(String),
    Bugfix(String),
    Release(String),
    Hotfix(String),
    Support(String),
    Unknown,
}

impl BranchRole {
    fn with_suffix(kind: BranchKind, suffix: &str) -> Self {
        let suffix = suffix.to_string();
        match kind {
            BranchKind::Main => BranchRole::Main,
            BranchKind::Develop => BranchRole::Develop,
            BranchKind::Feature => BranchRole::Feature(suffix),
            BranchKind::Bugfix => BranchRole::Bugfix(suffix),
            BranchKind::Release => BranchRole::Release(suffix),
            BranchKind::Hotfix => BranchRole::Hotfix(suffix),
            BranchKind::Support => BranchRole::Support(suffix),
            BranchKind::Unknown => BranchRole::Unknown,
        }
    }

    pub fn kind(&self) -> BranchKind {
        match self {
            BranchRole::Main => BranchKind::Main,
            BranchRole::Develop => BranchKind::Develop,
            BranchRole::Feature(_) => BranchKind::Feature,
            BranchRole::Bugfix(_) => BranchKind::Bugfix,
            BranchRole::Release(_) => BranchKind::Release,
            BranchRole::Hotfix(_) => BranchKind::Hotfix,
            BranchRole::Support(_) => BranchKind::Support,
            BranchRole::Unknown => BranchKind::Unknown,
        }
    }

    pub fn suffix(&self) -> Option<&str> {
        match self {
            BranchRole::Feature(s)
            | BranchRole::Bugfix(s)
            | BranchRole::Release(s)
            | BranchRole::Hotfix(s)
            | BranchRole::Support(s) => Some(s),
            _ => None,
        }
    }

    /// Check that a branch called `name` with this role can take part in a transition.
    ///
    /// Unknown roles and prefixed roles with an empty suffix are rejected.
    pub fn check_well_formed(&self, name: &str) -> Result<(), ClassificationError> {
        match self {
            BranchRole::Unknown => Err(ClassificationError::Unrecognized(name.to_string())),
            role if role.suffix() == Some("") => Err(ClassificationError::EmptySuffix {
                name: name.to_string(),
                kind: role.kind(),
            }),
            _ => Ok(()),
        }
    }
}

/// One entry of the ordered naming table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NamingRule<'a> {
    Exact(&'a str, BranchKind),
    Prefix(&'a str, BranchKind),
}

impl NamingRule<'_> {
    fn apply(&self, name: &str) -> Option<BranchRole> {
        match *self {
            NamingRule::Exact(expected, kind) if name == expected => {
                Some(BranchRole::with_suffix(kind, ""))
            }
            NamingRule::Prefix(prefix, kind) => name
                .strip_prefix(prefix)
                .map(|suffix| BranchRole::with_suffix(kind, suffix)),
            _ => None,
        }
    }
}

/// Exact names first, then prefixes from longest to shortest. Disabled (empty)
/// prefixes never appear.
fn naming_rules(cfg: &Configuration) -> Vec<NamingRule<'_>> {
    let mut prefixes: Vec<(&str, BranchKind)> = BranchKind::PREFIXED
        .iter()
        .filter_map(|&kind| cfg.prefix(kind).map(|p| (p, kind)))
        .collect();
    prefixes.sort_by_key(|(p, _)| std::cmp::Reverse(p.len()));

    let mut rules = vec![
        NamingRule::Exact(cfg.main_branch(), BranchKind::Main),
        NamingRule::Exact(cfg.develop_branch(), BranchKind::Develop),
    ];
    rules.extend(prefixes.into_iter().map(|(p, kind)| NamingRule::Prefix(p, kind)));
    rules
}

/// Classify a branch name. Total: anything unmatched is `Unknown`.
pub fn classify(name: &str, cfg: &Configuration) -> BranchRole {
    naming_rules(cfg)
        .iter()
        .find_map(|rule| rule.apply(name))
        .unwrap_or(BranchRole::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn cfg() -> Configuration {
        Config::default().validate().unwrap()
    }

    #[test]
    fn test_exact_names() {
        assert_eq!(classify("main", &cfg()), BranchRole::Main);
        assert_eq!(classify("develop", &cfg()), BranchRole::Develop);
    }

    #[test]
    fn test_prefixed_names_keep_suffix() {
        let cfg = cfg();
        assert_eq!(
            classify("feature/login", &cfg),
            BranchRole::Feature("login".to_string())
        );
        assert_eq!(
            classify("release/2.1.0", &cfg),
            BranchRole::Release("2.1.0".to_string())
        );
        assert_eq!(
            classify("support/1.x", &cfg),
            BranchRole::Support("1.x".to_string())
        );
    }

    #[test]
    fn test_unmatched_is_unknown() {
        assert_eq!(classify("wip-stuff", &cfg()), BranchRole::Unknown);
        assert_eq!(classify("", &cfg()), BranchRole::Unknown);
        assert_eq!(classify("Feature/x", &cfg()), BranchRole::Unknown);
    }

    #[test]
    fn test_exact_name_beats_prefix() {
        let mut config = Config::default();
        config.branches.main = "release/main".to_string();
        let cfg = config.validate().unwrap();

        assert_eq!(classify("release/main", &cfg), BranchRole::Main);
        assert_eq!(
            classify("release/1.0.0", &cfg),
            BranchRole::Release("1.0.0".to_string())
        );
    }

    #[test]
    fn test_empty_suffix_classifies_but_is_malformed() {
        let role = classify("release/", &cfg());
        assert_eq!(role, BranchRole::Release(String::new()));
        assert_eq!(
            role.check_well_formed("release/"),
            Err(ClassificationError::EmptySuffix {
                name: "release/".to_string(),
                kind: BranchKind::Release,
            })
        );
    }

    #[test]
    fn test_disabled_prefix_never_matches() {
        let mut config = Config::default();
        config.prefixes.support = String::new();
        let cfg = config.validate().unwrap();
        assert_eq!(classify("support/1.x", &cfg), BranchRole::Unknown);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let cfg = cfg();
        for name in ["main", "hotfix/1.0.1", "bugfix/", "random", "develop2"] {
            assert_eq!(classify(name, &cfg), classify(name, &cfg));
        }
    }

    #[test]
    fn test_kind_display_names() {
        let names: Vec<String> = BranchKind::ALL.iter().map(|k| k.to_string()).collect();
        assert_eq!(
            names,
            vec!["main", "develop", "feature", "bugfix", "release", "hotfix", "support", "unknown"]
        );
    }
}
