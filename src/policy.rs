//! Transition policy: the GitFlow legal-move table.
//!
//! Every permitted (source, target) pair is one [`Rule`] in [`RULES`]. Adding
//! a branch type or a GitFlow variant means adding rows, not branches of code.
//! Some rows carry a [`Lineage`] condition that can only be checked against
//! the repository; [`authorize`] stays pure and the orchestrator verifies it.

use std::fmt;

use crate::config::Configuration;
use crate::domain::{classify, BranchKind, Decision, EventKind, TransitionEvent};
use crate::error::PolicyDenied;

/// Repository condition attached to a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lineage {
    /// The target's head is an ancestor of the source tip (source was cut from target)
    CutFromTarget,
    /// Some version tag reachable from the source is also reachable from the target
    SharesReleaseWithTarget,
    /// The source tip carries a version tag, i.e. it is a completed release
    ReleasedTip,
}

impl fmt::Display for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lineage::CutFromTarget => f.write_str("must be cut from its target"),
            Lineage::SharesReleaseWithTarget => f.write_str("must share a release with its target"),
            Lineage::ReleasedTip => f.write_str("must point at a released version"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub source: BranchKind,
    pub target: BranchKind,
    pub lineage: Option<Lineage>,
}

impl Rule {
    const fn allow(source: BranchKind, target: BranchKind) -> Self {
        Rule {
            source,
            target,
            lineage: None,
        }
    }

    const fn allow_if(source: BranchKind, target: BranchKind, lineage: Lineage) -> Self {
        Rule {
            source,
            target,
            lineage: Some(lineage),
        }
    }
}

/// Legal merge targets. Anything absent is denied; `Unknown` never appears.
pub const RULES: &[Rule] = &[
    Rule::allow(BranchKind::Feature, BranchKind::Develop),
    Rule::allow(BranchKind::Bugfix, BranchKind::Develop),
    Rule::allow(BranchKind::Release, BranchKind::Main),
    Rule::allow(BranchKind::Release, BranchKind::Develop),
    Rule::allow(BranchKind::Hotfix, BranchKind::Main),
    Rule::allow(BranchKind::Hotfix, BranchKind::Develop),
    Rule::allow_if(BranchKind::Hotfix, BranchKind::Support, Lineage::CutFromTarget),
    Rule::allow_if(
        BranchKind::Support,
        BranchKind::Main,
        Lineage::SharesReleaseWithTarget,
    ),
    // forward-merges opened after a completion
    Rule::allow_if(BranchKind::Main, BranchKind::Develop, Lineage::ReleasedTip),
    Rule::allow_if(BranchKind::Main, BranchKind::Support, Lineage::ReleasedTip),
];

pub fn find_rule(source: BranchKind, target: BranchKind) -> Option<&'static Rule> {
    RULES
        .iter()
        .find(|rule| rule.source == source && rule.target == target)
}

/// Decide a (source, target) pair from the table alone.
pub fn authorize_kinds(source: BranchKind, target: BranchKind) -> Decision {
    match find_rule(source, target) {
        Some(_) => Decision::Allowed,
        None => Decision::Denied(PolicyDenied::Disallowed { from: source, to: target }.to_string()),
    }
}

/// Authorize an event.
///
/// The source must be well formed. Without a target (a plain push) that is
/// all; a merge request must name a well-formed target and the pair must be
/// in [`RULES`].
pub fn authorize(event: &TransitionEvent, cfg: &Configuration) -> Decision {
    let source = classify(&event.source, cfg);
    if let Err(e) = source.check_well_formed(&event.source) {
        return Decision::Denied(e.to_string());
    }

    let target_name = match (&event.target, event.kind) {
        (Some(target), _) => target,
        (None, EventKind::Push) => return Decision::Allowed,
        (None, EventKind::MergeRequest) => {
            return Decision::Denied(PolicyDenied::MissingTarget(event.source.clone()).to_string())
        }
    };

    let target = classify(target_name, cfg);
    if target.kind() != BranchKind::Unknown {
        if let Err(e) = target.check_well_formed(target_name) {
            return Decision::Denied(e.to_string());
        }
    }

    authorize_kinds(source.kind(), target.kind())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn cfg() -> Configuration {
        Config::default().validate().unwrap()
    }

    #[test]
    fn test_feature_into_develop() {
        let event = TransitionEvent::merge_request("feature/login", "develop");
        assert_eq!(authorize(&event, &cfg()), Decision::Allowed);
    }

    #[test]
    fn test_feature_into_main_denied() {
        let event = TransitionEvent::merge_request("feature/login", "main");
        assert_eq!(
            authorize(&event, &cfg()),
            Decision::Denied("feature -> main not permitted".to_string())
        );
    }

    #[test]
    fn test_unknown_source_denied() {
        let event = TransitionEvent::merge_request("wip", "develop");
        assert_eq!(
            authorize(&event, &cfg()),
            Decision::Denied("branch 'wip' does not follow naming conventions".to_string())
        );
    }

    #[test]
    fn test_empty_suffix_denied_on_either_side() {
        let event = TransitionEvent::push("release/");
        assert!(matches!(authorize(&event, &cfg()), Decision::Denied(r) if r.contains("malformed")));

        let event = TransitionEvent::merge_request("hotfix/1.0.1", "support/");
        assert!(matches!(authorize(&event, &cfg()), Decision::Denied(r) if r.contains("malformed")));
    }

    #[test]
    fn test_push_checks_source_only() {
        for name in ["main", "develop", "feature/a", "support/1.x"] {
            assert_eq!(authorize(&TransitionEvent::push(name), &cfg()), Decision::Allowed);
        }
        assert!(!authorize(&TransitionEvent::push("tmp"), &cfg()).is_allowed());
    }

    #[test]
    fn test_merge_request_without_target_denied() {
        let mut event = TransitionEvent::merge_request("feature/a", "develop");
        event.target = None;
        assert_eq!(
            authorize(&event, &cfg()),
            Decision::Denied("merge request from 'feature/a' has no target branch".to_string())
        );
    }

    #[test]
    fn test_unknown_target_names_the_pair() {
        let event = TransitionEvent::merge_request("feature/a", "staging");
        assert_eq!(
            authorize(&event, &cfg()),
            Decision::Denied("feature -> unknown not permitted".to_string())
        );
    }

    #[test]
    fn test_lineage_rules() {
        assert_eq!(
            find_rule(BranchKind::Hotfix, BranchKind::Support).and_then(|r| r.lineage),
            Some(Lineage::CutFromTarget)
        );
        assert_eq!(
            find_rule(BranchKind::Feature, BranchKind::Develop).and_then(|r| r.lineage),
            None
        );
    }
}
