use crate::config::Configuration;
use crate::domain::SemVer;

/// Format a version as a tag name, e.g. prefix "v" and 2.1.0 -> "v2.1.0"
pub fn format_tag(version: &SemVer, prefix: &str) -> String {
    format!("{}{}", prefix, version)
}

/// Read the version out of a tag name.
///
/// The configured prefix is stripped when present. Tags that are not a strict
/// `major.minor.patch` afterwards yield `None`; repositories may carry unrelated tags.
pub fn classify_tag(name: &str, cfg: &Configuration) -> Option<SemVer> {
    let prefix = cfg.version_tag_prefix();
    let version = name.strip_prefix(prefix).unwrap_or(name);
    SemVer::parse(version).ok()
}
