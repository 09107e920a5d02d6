//! Release orchestration: authorize an event and, when it completes a release
//! or hotfix, apply the tag and the forward-merge.
//!
//! Nothing is written to the repository unless the event is allowed. Each
//! follow-up step reads the current repository state before acting, so a run
//! interrupted halfway can simply be repeated.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::boundary::BoundaryWarning;
use crate::config::Configuration;
use crate::domain::{
    classify, classify_tag, format_tag, ActionOutcome, BranchKind, BranchRole, CompletedAction, Decision,
    Evaluation, EventKind, FailedStep, FollowUpAction, SemVer, TransitionEvent,
};
use crate::error::{PolicyDenied, PortError, StepError, VersionError};
use crate::git::{CommitId, VersionControlPort};
use crate::policy::{self, Lineage};
use crate::resolver;

/// A merge into main that has landed, or a push to main carrying a release candidate.
#[derive(Debug)]
struct Completion {
    role: BranchRole,
    /// Tip of the completing branch; absent for a push to main
    tip: Option<CommitId>,
}

struct VersionTag {
    version: SemVer,
    commit: CommitId,
}

pub struct ReleaseOrchestrator<'a, P: ?Sized> {
    cfg: &'a Configuration,
    port: &'a P,
}

/// Evaluate one event against `port`. See [`ReleaseOrchestrator::evaluate`].
pub fn evaluate<P: VersionControlPort + ?Sized>(
    event: &TransitionEvent,
    cfg: &Configuration,
    port: &P,
) -> Evaluation {
    ReleaseOrchestrator::new(cfg, port).evaluate(event)
}

impl<'a, P: VersionControlPort + ?Sized> ReleaseOrchestrator<'a, P> {
    pub fn new(cfg: &'a Configuration, port: &'a P) -> Self {
        ReleaseOrchestrator { cfg, port }
    }

    /// Decide the event and run any follow-up actions it triggers.
    ///
    /// Denials return before any write. Port failures after authorization are
    /// recorded per step in [`Evaluation::failed`] and never hide the steps
    /// that did succeed.
    pub fn evaluate(&self, event: &TransitionEvent) -> Evaluation {
        info!(
            kind = %event.kind,
            source = %event.source,
            target = event.target.as_deref().unwrap_or("-"),
            "evaluating event"
        );

        if let Decision::Denied(reason) = policy::authorize(event, self.cfg) {
            warn!(%reason, "transition denied");
            return Evaluation::denied(reason);
        }

        let mut eval = Evaluation::allowed();
        let source = classify(&event.source, self.cfg);
        let target = event.target.as_deref().map(|t| (t, classify(t, self.cfg)));

        self.check_release_candidate(event, &source, &mut eval);

        if let Some((target_name, target_role)) = &target {
            let lineage = policy::find_rule(source.kind(), target_role.kind()).and_then(|r| r.lineage);
            if let Some(lineage) = lineage {
                match self.verify_lineage(lineage, event, target_name, &mut eval) {
                    Ok(true) => debug!(%lineage, "lineage verified"),
                    Ok(false) => {
                        let denied = PolicyDenied::Lineage {
                            branch: event.source.clone(),
                            target: target_name.to_string(),
                        };
                        eval.decision = Decision::Denied(format!("{} ({})", denied, lineage));
                        return eval;
                    }
                    Err(e) => {
                        eval.decision =
                            Decision::Denied(format!("lineage of '{}' could not be verified", event.source));
                        eval.failed.push(FailedStep {
                            step: format!("verify lineage of '{}'", event.source),
                            action: None,
                            error: e.into(),
                        });
                        return eval;
                    }
                }
            }
        }

        let target_kind = target.as_ref().map(|(_, role)| role.kind());
        match self.detect_completion(event, &source, target_kind) {
            Ok(Some(completion)) => self.complete(event, completion, &mut eval),
            Ok(None) => {}
            Err(e) => eval.failed.push(FailedStep {
                step: format!("check whether '{}' has landed", event.source),
                action: None,
                error: e.into(),
            }),
        }

        eval
    }

    fn check_release_candidate(
        &self,
        event: &TransitionEvent,
        source: &BranchRole,
        eval: &mut Evaluation,
    ) {
        let Some(candidate) = event.release_candidate.as_deref() else {
            debug!("no release candidate provided");
            return;
        };
        if let BranchRole::Release(suffix) | BranchRole::Hotfix(suffix) = source {
            if suffix != candidate {
                let warning = BoundaryWarning::ReleaseCandidateMismatch {
                    branch: event.source.clone(),
                    candidate: candidate.to_string(),
                };
                warn!("{}", warning);
                eval.warnings.push(warning);
            }
        }
    }

    fn source_tip(&self, event: &TransitionEvent) -> Result<CommitId, PortError> {
        match &event.source_tip {
            Some(tip) => Ok(tip.clone()),
            None => self.port.branch_head(&event.source),
        }
    }

    /// Version tags with their commits. Other tags are skipped and noted.
    fn version_tags(&self, eval: &mut Evaluation) -> Result<Vec<VersionTag>, PortError> {
        let mut found = Vec::new();
        for tag in self.port.list_tags()? {
            let Some(version) = classify_tag(&tag, self.cfg) else {
                let warning = BoundaryWarning::IgnoredTag { tag };
                debug!("{}", warning);
                if !eval.warnings.contains(&warning) {
                    eval.warnings.push(warning);
                }
                continue;
            };
            if let Some(commit) = self.port.find_tag_target(&tag)? {
                found.push(VersionTag { version, commit });
            }
        }
        Ok(found)
    }

    fn verify_lineage(
        &self,
        lineage: Lineage,
        event: &TransitionEvent,
        target: &str,
        eval: &mut Evaluation,
    ) -> Result<bool, PortError> {
        let tip = self.source_tip(event)?;
        match lineage {
            Lineage::CutFromTarget => {
                let target_head = self.port.branch_head(target)?;
                self.port.is_ancestor(&target_head, &tip)
            }
            Lineage::SharesReleaseWithTarget => {
                let target_head = self.port.branch_head(target)?;
                for tag in self.version_tags(eval)? {
                    if self.port.is_ancestor(&tag.commit, &tip)?
                        && self.port.is_ancestor(&tag.commit, &target_head)?
                    {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Lineage::ReleasedTip => Ok(self
                .version_tags(eval)?
                .iter()
                .any(|tag| tag.commit == tip)),
        }
    }

    fn detect_completion(
        &self,
        event: &TransitionEvent,
        source: &BranchRole,
        target: Option<BranchKind>,
    ) -> Result<Option<Completion>, PortError> {
        match (event.kind, source, target) {
            (
                EventKind::MergeRequest,
                BranchRole::Release(_) | BranchRole::Hotfix(_),
                Some(BranchKind::Main),
            ) => {
                let tip = self.source_tip(event)?;
                let main_head = self.port.branch_head(self.cfg.main_branch())?;
                if self.port.is_ancestor(&tip, &main_head)? {
                    info!(source = %event.source, "completion detected");
                    Ok(Some(Completion {
                        role: source.clone(),
                        tip: Some(tip),
                    }))
                } else {
                    debug!(source = %event.source, "not merged yet, nothing to complete");
                    Ok(None)
                }
            }
            (EventKind::Push, BranchRole::Main, None) if event.release_candidate.is_some() => {
                info!("push to {} with a release candidate", self.cfg.main_branch());
                Ok(Some(Completion {
                    role: BranchRole::Main,
                    tip: None,
                }))
            }
            (EventKind::Push, BranchRole::Main, None) => {
                debug!(
                    "No release candidate so nothing to be done after push to {}",
                    self.cfg.main_branch()
                );
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn complete(&self, event: &TransitionEvent, completion: Completion, eval: &mut Evaluation) {
        let main = self.cfg.main_branch();
        let main_head = match self.port.branch_head(main) {
            Ok(head) => head,
            Err(e) => {
                eval.failed.push(FailedStep {
                    step: format!("read head of '{}'", main),
                    action: None,
                    error: e.into(),
                });
                return;
            }
        };

        let tip = completion.tip.as_ref();
        match self.resolve_tag(event, &completion.role, tip, &main_head, eval) {
            Ok(tag) => {
                let outcome = self.create_tag(&tag, &main_head, tip);
                record(eval, FollowUpAction::CreateTag(tag), outcome);
            }
            Err(error) => {
                warn!(%error, "version resolution failed");
                eval.failed.push(FailedStep {
                    step: format!("resolve version for '{}'", event.source),
                    action: None,
                    error,
                });
            }
        }

        // The forward-merge does not depend on the tag; attempt it either way.
        match self.forward_merge_target(&completion) {
            Ok(to) => {
                let outcome = self.open_merge(main, &to, &main_head);
                let action = FollowUpAction::OpenMerge {
                    from: main.to_string(),
                    to,
                };
                record(eval, action, outcome);
            }
            Err(e) => eval.failed.push(FailedStep {
                step: "find forward-merge target".to_string(),
                action: None,
                error: e.into(),
            }),
        }
    }

    /// Tag name for the completion.
    ///
    /// A hotfix already released by an earlier run (a version tag on main that
    /// contains the hotfix tip) resolves to that tag again, so a re-run does
    /// not bump the patch a second time.
    fn resolve_tag(
        &self,
        event: &TransitionEvent,
        role: &BranchRole,
        tip: Option<&CommitId>,
        main_head: &CommitId,
        eval: &mut Evaluation,
    ) -> Result<String, StepError> {
        let candidate = event.release_candidate.as_deref();
        let mut existing = BTreeSet::new();
        if resolver::needs_baseline(role, candidate) {
            let mut released = BTreeSet::new();
            for tag in self.version_tags(eval)? {
                if !self.port.is_ancestor(&tag.commit, main_head)? {
                    continue;
                }
                if self.contains_tip(&tag.commit, tip)? {
                    released.insert(tag.version);
                } else {
                    existing.insert(tag.version);
                }
            }
            if let Some(version) = released.first() {
                debug!(%version, source = %event.source, "already released");
                return Ok(format_tag(version, self.cfg.version_tag_prefix()));
            }
        }
        Ok(resolver::resolve_tag(role, &existing, candidate, self.cfg)?)
    }

    fn contains_tip(&self, commit: &CommitId, tip: Option<&CommitId>) -> Result<bool, PortError> {
        match tip {
            Some(tip) => self.port.is_ancestor(tip, commit),
            None => Ok(false),
        }
    }

    /// Create `tag` on `commit`, main's head.
    ///
    /// An existing tag counts as present when it is on `commit`, or when it is
    /// on main and contains the completing branch's tip (main moved on since).
    fn create_tag(
        &self,
        tag: &str,
        commit: &CommitId,
        tip: Option<&CommitId>,
    ) -> Result<ActionOutcome, StepError> {
        let conflict = |existing: &str| VersionError::TagConflict {
            tag: tag.to_string(),
            existing: existing.to_string(),
            expected: commit.short().to_string(),
        };

        if let Some(existing) = self.port.find_tag_target(tag)? {
            if &existing == commit
                || (self.contains_tip(&existing, tip)? && self.port.is_ancestor(&existing, commit)?)
            {
                return Ok(ActionOutcome::AlreadyPresent);
            }
            return Err(conflict(existing.short()).into());
        }

        match self.port.create_tag(tag, commit) {
            Ok(()) => Ok(ActionOutcome::Created),
            Err(PortError::Conflict(_)) => {
                let existing = self
                    .port
                    .find_tag_target(tag)
                    .ok()
                    .flatten()
                    .map(|c| c.short().to_string())
                    .unwrap_or_else(|| "another commit".to_string());
                Err(conflict(&existing).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Develop, or the support line a hotfix was cut from: the first support
    /// branch (by name) whose head the hotfix contains and develop does not.
    fn forward_merge_target(&self, completion: &Completion) -> Result<String, PortError> {
        let develop = self.cfg.develop_branch().to_string();
        let (BranchRole::Hotfix(_), Some(tip)) = (&completion.role, &completion.tip) else {
            return Ok(develop);
        };
        if self.cfg.prefix(BranchKind::Support).is_none() {
            return Ok(develop);
        }

        let develop_head = self.port.branch_head(&develop)?;
        let mut branches = self.port.list_branches()?;
        branches.sort();
        for branch in branches {
            match classify(&branch, self.cfg) {
                BranchRole::Support(suffix) if !suffix.is_empty() => {}
                _ => continue,
            }
            let head = self.port.branch_head(&branch)?;
            if self.port.is_ancestor(&head, tip)? && !self.port.is_ancestor(&head, &develop_head)? {
                debug!(support = %branch, "hotfix was cut from a support line");
                return Ok(branch);
            }
        }
        Ok(develop)
    }

    fn open_merge(&self, from: &str, to: &str, from_head: &CommitId) -> Result<ActionOutcome, StepError> {
        let to_head = self.port.branch_head(to)?;
        if self.port.is_ancestor(from_head, &to_head)? {
            return Ok(ActionOutcome::AlreadyPresent);
        }
        Ok(ActionOutcome::Opened(self.port.open_merge(from, to)?))
    }
}

fn record(eval: &mut Evaluation, action: FollowUpAction, outcome: Result<ActionOutcome, StepError>) {
    match outcome {
        Ok(outcome) => {
            info!(action = %action, ?outcome, "follow-up action done");
            eval.completed.push(CompletedAction { action, outcome });
        }
        Err(error) => {
            warn!(action = %action, %error, "follow-up action failed");
            eval.failed.push(FailedStep {
                step: action.to_string(),
                action: Some(action),
                error,
            });
        }
    }
}
