// tests/policy_test.rs
use gitflow_guard::config::{Config, Configuration};
use gitflow_guard::domain::{BranchKind, Decision, TransitionEvent};
use gitflow_guard::policy::{authorize, find_rule, Lineage, RULES};

fn cfg() -> Configuration {
    Config::default().validate().unwrap()
}

fn sample_name(kind: BranchKind) -> &'static str {
    match kind {
        BranchKind::Main => "main",
        BranchKind::Develop => "develop",
        BranchKind::Feature => "feature/search",
        BranchKind::Bugfix => "bugfix/typo",
        BranchKind::Release => "release/2.1.0",
        BranchKind::Hotfix => "hotfix/1.2.4",
        BranchKind::Support => "support/1.x",
        BranchKind::Unknown => "experiment",
    }
}

/// GitFlow merge targets, written out independently of the rule table
fn legal(source: BranchKind, target: BranchKind) -> bool {
    use BranchKind::*;
    matches!(
        (source, target),
        (Feature, Develop)
            | (Bugfix, Develop)
            | (Release, Main)
            | (Release, Develop)
            | (Hotfix, Main)
            | (Hotfix, Develop)
            | (Hotfix, Support)
            | (Support, Main)
            | (Main, Develop)
            | (Main, Support)
    )
}

#[test]
fn test_every_pair_matches_gitflow() {
    let cfg = cfg();
    for source in BranchKind::ALL {
        for target in BranchKind::ALL {
            let event = TransitionEvent::merge_request(sample_name(source), sample_name(target));
            let decision = authorize(&event, &cfg);

            if source == BranchKind::Unknown {
                assert_eq!(
                    decision,
                    Decision::Denied("branch 'experiment' does not follow naming conventions".to_string()),
                    "{} -> {}",
                    source,
                    target
                );
            } else if legal(source, target) {
                assert_eq!(decision, Decision::Allowed, "{} -> {}", source, target);
            } else {
                assert_eq!(
                    decision,
                    Decision::Denied(format!("{} -> {} not permitted", source, target)),
                    "{} -> {}",
                    source,
                    target
                );
            }
        }
    }
}

#[test]
fn test_table_never_mentions_unknown() {
    assert!(RULES
        .iter()
        .all(|r| r.source != BranchKind::Unknown && r.target != BranchKind::Unknown));
}

#[test]
fn test_develop_and_main_only_forward_merge_released_tips() {
    for target in BranchKind::ALL {
        assert!(find_rule(BranchKind::Develop, target).is_none());
    }
    assert_eq!(
        find_rule(BranchKind::Main, BranchKind::Develop).and_then(|r| r.lineage),
        Some(Lineage::ReleasedTip)
    );
}

#[test]
fn test_push_needs_only_a_well_formed_source() {
    let cfg = cfg();
    for kind in BranchKind::ALL {
        let decision = authorize(&TransitionEvent::push(sample_name(kind)), &cfg);
        assert_eq!(
            decision.is_allowed(),
            kind != BranchKind::Unknown,
            "push of {}",
            kind
        );
    }
}

#[test]
fn test_prefix_without_name_is_malformed() {
    let event = TransitionEvent::merge_request("feature/", "develop");
    assert_eq!(
        authorize(&event, &cfg()),
        Decision::Denied(
            "branch 'feature/' is malformed: feature branches need a name after the prefix"
                .to_string()
        )
    );
}

#[test]
fn test_merge_request_without_target_denied() {
    let mut event = TransitionEvent::merge_request("feature/x", "develop");
    event.target = None;
    assert_eq!(
        authorize(&event, &cfg()),
        Decision::Denied("merge request from 'feature/x' has no target branch".to_string())
    );
}

#[test]
fn test_disabled_type_is_unknown() {
    let mut config = Config::default();
    config.prefixes.bugfix = String::new();
    let cfg = config.validate().unwrap();

    let event = TransitionEvent::merge_request("bugfix/typo", "develop");
    assert!(!authorize(&event, &cfg).is_allowed());
}
