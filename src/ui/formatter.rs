//! Formatting functions for the verdict.
//!
//! `format_*` functions build plain text and are tested; `display_*` functions
//! add color and print.

use console::style;

use crate::boundary::BoundaryWarning;
use crate::domain::{ActionOutcome, Evaluation, FollowUpAction};

/// Print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Print a success message with a green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Print a status message with a yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// One line per follow-up action and failed step.
///
/// `previewed` lists writes skipped in a dry run; they are shown instead of
/// the completed actions' outcomes when non-empty.
pub fn format_evaluation(evaluation: &Evaluation, previewed: &[FollowUpAction]) -> Vec<String> {
    let mut lines = Vec::new();

    if previewed.is_empty() {
        for done in &evaluation.completed {
            let outcome = match &done.outcome {
                ActionOutcome::Created => "done".to_string(),
                ActionOutcome::AlreadyPresent => "already present".to_string(),
                ActionOutcome::Opened(merge) => format!("opened {}", merge),
            };
            lines.push(format!("{}: {}", done.action, outcome));
        }
    }
    for action in previewed {
        lines.push(format!("would {}", action));
    }
    for failed in &evaluation.failed {
        lines.push(format!("failed: {}", failed));
    }
    lines
}

/// Print warnings, step details, and the summary line.
///
/// The summary goes to stdout on success and to stderr otherwise.
pub fn display_evaluation(evaluation: &Evaluation, previewed: &[FollowUpAction]) {
    for warning in &evaluation.warnings {
        display_boundary_warning(warning);
    }
    for line in format_evaluation(evaluation, previewed) {
        display_status(&line);
    }

    if evaluation.is_success() {
        display_success(&evaluation.summary());
    } else {
        display_error(&evaluation.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CompletedAction, FailedStep};
    use crate::error::{PortError, StepError};
    use crate::git::MergeRef;

    #[test]
    fn test_format_completed_actions() {
        let mut eval = Evaluation::allowed();
        eval.completed.push(CompletedAction {
            action: FollowUpAction::CreateTag("v1.0.0".to_string()),
            outcome: ActionOutcome::AlreadyPresent,
        });
        eval.completed.push(CompletedAction {
            action: FollowUpAction::OpenMerge {
                from: "main".to_string(),
                to: "develop".to_string(),
            },
            outcome: ActionOutcome::Opened(MergeRef {
                id: "#7".to_string(),
                url: None,
            }),
        });

        assert_eq!(
            format_evaluation(&eval, &[]),
            vec![
                "create tag v1.0.0: already present".to_string(),
                "open merge main -> develop: opened #7".to_string(),
            ]
        );
    }

    #[test]
    fn test_format_preview_and_failures() {
        let mut eval = Evaluation::allowed();
        let action = FollowUpAction::CreateTag("v1.0.0".to_string());
        eval.completed.push(CompletedAction {
            action: action.clone(),
            outcome: ActionOutcome::Created,
        });
        eval.failed.push(FailedStep {
            step: "open merge main -> develop".to_string(),
            action: None,
            error: StepError::Port(PortError::Timeout("pulls".to_string())),
        });

        assert_eq!(
            format_evaluation(&eval, &[action]),
            vec![
                "would create tag v1.0.0".to_string(),
                "failed: open merge main -> develop: timed out: pulls".to_string(),
            ]
        );
    }

    #[test]
    fn test_display_functions_do_not_panic() {
        display_error("test error");
        display_success("test success");
        display_status("test status");
        display_evaluation(&Evaluation::denied("feature -> main not permitted"), &[]);
    }
}
