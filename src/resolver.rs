//! Version resolution for completing releases and hotfixes.
//!
//! Resolution is read-only: it computes the tag name that the orchestrator
//! will ask the port to create, nothing more.

use std::collections::BTreeSet;

use crate::config::Configuration;
use crate::domain::{format_tag, BranchRole, SemVer};
use crate::error::VersionError;

/// Whether resolution for `role` needs the set of version tags reachable from main.
pub fn needs_baseline(role: &BranchRole, release_candidate: Option<&str>) -> bool {
    release_candidate.is_none() && matches!(role, BranchRole::Hotfix(_))
}

/// Compute the version a completing branch should be tagged with.
///
/// In order of precedence:
/// 1. an explicit release candidate, which must be a strict `major.minor.patch`
/// 2. the suffix of a release branch, which must itself be a version
/// 3. for a hotfix, the next patch after the highest version in `existing`
///
/// `existing` holds the versions already tagged on main; `main_branch` only
/// names it in errors.
pub fn resolve_version(
    role: &BranchRole,
    existing: &BTreeSet<SemVer>,
    release_candidate: Option<&str>,
    main_branch: &str,
) -> Result<SemVer, VersionError> {
    if let Some(candidate) = release_candidate {
        return SemVer::parse(candidate)
            .map_err(|e| VersionError::malformed(format!("release candidate {}", inner(e))));
    }

    match role {
        BranchRole::Release(suffix) => SemVer::parse(suffix)
            .map_err(|e| VersionError::malformed(format!("release branch name {}", inner(e)))),
        BranchRole::Hotfix(_) => existing
            .iter()
            .max()
            .ok_or_else(|| VersionError::NoBaseline(main_branch.to_string()))?
            .next_patch(),
        other => Err(VersionError::malformed(format!(
            "no version can be derived from a {} branch without a release candidate",
            other.kind()
        ))),
    }
}

/// [`resolve_version`] formatted with the configured tag prefix.
pub fn resolve_tag(
    role: &BranchRole,
    existing: &BTreeSet<SemVer>,
    release_candidate: Option<&str>,
    cfg: &Configuration,
) -> Result<String, VersionError> {
    let version = resolve_version(role, existing, release_candidate, cfg.main_branch())?;
    Ok(format_tag(&version, cfg.version_tag_prefix()))
}

fn inner(e: VersionError) -> String {
    match e {
        VersionError::Malformed(msg) => msg,
        other => other.to_string(),
    }
}
