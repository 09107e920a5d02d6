//! Inputs and outputs of one engine evaluation.

use std::fmt;

use crate::boundary::BoundaryWarning;
use crate::error::StepError;
use crate::git::{CommitId, MergeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Push,
    MergeRequest,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Push => f.write_str("push"),
            EventKind::MergeRequest => f.write_str("merge request"),
        }
    }
}

/// A CI event to evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEvent {
    pub kind: EventKind,
    pub source: String,
    /// Absent for a plain push
    pub target: Option<String>,
    pub release_candidate: Option<String>,
    /// Tip of the source branch as seen by the event, when the CI system reports it
    pub source_tip: Option<CommitId>,
}

impl TransitionEvent {
    pub fn push(source: impl Into<String>) -> Self {
        TransitionEvent {
            kind: EventKind::Push,
            source: source.into(),
            target: None,
            release_candidate: None,
            source_tip: None,
        }
    }

    pub fn merge_request(source: impl Into<String>, target: impl Into<String>) -> Self {
        TransitionEvent {
            kind: EventKind::MergeRequest,
            source: source.into(),
            target: Some(target.into()),
            release_candidate: None,
            source_tip: None,
        }
    }

    /// An empty candidate means none was supplied.
    pub fn with_release_candidate(mut self, candidate: impl Into<String>) -> Self {
        let candidate = candidate.into();
        self.release_candidate = if candidate.is_empty() {
            None
        } else {
            Some(candidate)
        };
        self
    }

    pub fn with_source_tip(mut self, tip: impl Into<CommitId>) -> Self {
        self.source_tip = Some(tip.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Side effect required when a release or hotfix completes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FollowUpAction {
    CreateTag(String),
    OpenMerge { from: String, to: String },
}

impl fmt::Display for FollowUpAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowUpAction::CreateTag(name) => write!(f, "create tag {}", name),
            FollowUpAction::OpenMerge { from, to } => write!(f, "open merge {} -> {}", from, to),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Created,
    /// The repository already reflected the action; nothing was written
    AlreadyPresent,
    Opened(MergeRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedAction {
    pub action: FollowUpAction,
    pub outcome: ActionOutcome,
}

/// A step that failed after authorization succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedStep {
    /// What was being attempted, e.g. "create tag v2.1.0"
    pub step: String,
    pub action: Option<FollowUpAction>,
    pub error: StepError,
}

impl fmt::Display for FailedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.error)
    }
}

/// Result of evaluating one event: the decision, every executed follow-up
/// action in order, every failed step, and non-fatal warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: Decision,
    pub completed: Vec<CompletedAction>,
    pub failed: Vec<FailedStep>,
    pub warnings: Vec<BoundaryWarning>,
}

impl Evaluation {
    pub fn allowed() -> Self {
        Evaluation {
            decision: Decision::Allowed,
            completed: Vec::new(),
            failed: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Evaluation {
            decision: Decision::Denied(reason.into()),
            ..Evaluation::allowed()
        }
    }

    /// Allowed, and every follow-up step went through
    pub fn is_success(&self) -> bool {
        self.decision.is_allowed() && self.failed.is_empty()
    }

    /// Executed actions, in execution order
    pub fn actions(&self) -> Vec<FollowUpAction> {
        self.completed.iter().map(|c| c.action.clone()).collect()
    }

    /// Single human-readable line describing the outcome.
    pub fn summary(&self) -> String {
        if let Decision::Denied(reason) = &self.decision {
            return format!("Denied: {}", reason);
        }

        if !self.failed.is_empty() {
            let failures: Vec<String> = self.failed.iter().map(|f| f.to_string()).collect();
            return format!(
                "Allowed, but {} follow-up step(s) failed: {}",
                self.failed.len(),
                failures.join("; ")
            );
        }

        if self.completed.is_empty() {
            "All is OK.".to_string()
        } else {
            let done: Vec<String> = self.completed.iter().map(|c| c.action.to_string()).collect();
            format!("All is OK. Completed: {}", done.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PortError;

    #[test]
    fn test_empty_release_candidate_is_none() {
        let event = TransitionEvent::push("main").with_release_candidate("");
        assert_eq!(event.release_candidate, None);

        let event = TransitionEvent::push("main").with_release_candidate("1.0.0");
        assert_eq!(event.release_candidate.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_summary_denied() {
        let eval = Evaluation::denied("feature -> main not permitted");
        assert!(!eval.is_success());
        assert_eq!(eval.summary(), "Denied: feature -> main not permitted");
    }

    #[test]
    fn test_summary_lists_completed_actions() {
        let mut eval = Evaluation::allowed();
        eval.completed.push(CompletedAction {
            action: FollowUpAction::CreateTag("v1.0.0".to_string()),
            outcome: ActionOutcome::Created,
        });
        assert!(eval.is_success());
        assert_eq!(eval.summary(), "All is OK. Completed: create tag v1.0.0");
    }

    #[test]
    fn test_summary_reports_partial_completion() {
        let mut eval = Evaluation::allowed();
        eval.completed.push(CompletedAction {
            action: FollowUpAction::CreateTag("v1.0.0".to_string()),
            outcome: ActionOutcome::Created,
        });
        let merge = FollowUpAction::OpenMerge {
            from: "main".to_string(),
            to: "develop".to_string(),
        };
        eval.failed.push(FailedStep {
            step: merge.to_string(),
            action: Some(merge),
            error: PortError::Timeout("POST /pulls".to_string()).into(),
        });

        assert!(!eval.is_success());
        assert_eq!(
            eval.summary(),
            "Allowed, but 1 follow-up step(s) failed: open merge main -> develop: timed out: POST /pulls"
        );
    }
}
