//! Workflow orchestration
//!
//! Wires configuration, event context, and a repository port into one engine
//! run. Kept apart from `main.rs` so the whole workflow can be driven without
//! clap or a real CI environment.

use std::env;

use tracing::info;

use crate::cli::args::{Args, Backend};
use crate::cli::context::EventContext;
use crate::config::{load_config, ConfigOverrides, Configuration};
use crate::domain::{Evaluation, FollowUpAction, TransitionEvent};
use crate::error::Result;
use crate::git::{DryRunPort, Git2Repository, GitHubRepository, VersionControlPort};
use crate::orchestrator::evaluate;

/// Arguments for one workflow run
///
/// Mirrors the CLI Args in a form that does not depend on clap.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowArgs {
    /// Path to custom config file
    pub config_path: Option<String>,

    /// Command-line values layered over the config file
    pub overrides: ConfigOverrides,

    /// Version to release instead of the one the branch implies
    pub release_candidate: Option<String>,

    pub backend: Backend,

    /// Record writes instead of performing them
    pub dry_run: bool,
}

impl From<&Args> for WorkflowArgs {
    fn from(args: &Args) -> Self {
        WorkflowArgs {
            config_path: args.config.clone(),
            overrides: args.to_overrides(),
            release_candidate: args.release_candidate.clone(),
            backend: args.backend,
            dry_run: args.dry_run,
        }
    }
}

/// Outcome of a workflow run
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowResult {
    pub evaluation: Evaluation,

    /// Writes skipped because of `--dry-run`, in order
    pub previewed: Vec<FollowUpAction>,
}

impl WorkflowResult {
    /// Process exit status: 0 when allowed and every follow-up step succeeded
    pub fn exit_code(&self) -> i32 {
        if self.evaluation.is_success() {
            0
        } else {
            1
        }
    }
}

/// Run the engine for the CI event described by the environment.
///
/// # Errors
///
/// Configuration errors abort before any repository is opened. Failures to
/// read the event or to open the port are returned as errors as well; failures
/// during follow-up steps are part of the returned evaluation instead.
pub fn run_workflow(args: &WorkflowArgs) -> Result<WorkflowResult> {
    let cfg = load_config(args.config_path.as_deref())?
        .with_overrides(&args.overrides)
        .validate()?;
    info!(
        main = cfg.main_branch(),
        develop = cfg.develop_branch(),
        tag_prefix = cfg.version_tag_prefix(),
        "configuration loaded"
    );

    let event = match EventContext::from_env(cfg.develop_branch())? {
        EventContext::Event(event) => event,
        EventContext::Ignored(warning) => {
            info!("{}", warning);
            let mut evaluation = Evaluation::allowed();
            evaluation.warnings.push(warning);
            return Ok(WorkflowResult {
                evaluation,
                previewed: Vec::new(),
            });
        }
    };
    let event = match args.release_candidate.as_deref() {
        Some(candidate) => event.with_release_candidate(candidate),
        None => event,
    };

    let port = open_port(args.backend, &cfg)?;
    Ok(evaluate_with_port(&event, &cfg, port, args.dry_run))
}

/// Evaluate `event` against an already opened port.
pub fn evaluate_with_port<P: VersionControlPort>(
    event: &TransitionEvent,
    cfg: &Configuration,
    port: P,
    dry_run: bool,
) -> WorkflowResult {
    if dry_run {
        let port = DryRunPort::new(port);
        let evaluation = evaluate(event, cfg, &port);
        WorkflowResult {
            evaluation,
            previewed: port.recorded(),
        }
    } else {
        WorkflowResult {
            evaluation: evaluate(event, cfg, &port),
            previewed: Vec::new(),
        }
    }
}

fn github_configured() -> bool {
    ["GITHUB_TOKEN", "GITHUB_REPOSITORY"]
        .iter()
        .all(|key| env::var(key).map(|v| !v.is_empty()).unwrap_or(false))
}

fn open_port(backend: Backend, cfg: &Configuration) -> Result<Box<dyn VersionControlPort>> {
    let use_github = match backend {
        Backend::Github => true,
        Backend::Local => false,
        Backend::Auto => github_configured(),
    };

    if use_github {
        info!(timeout = ?cfg.timeout(), "using GitHub repository");
        Ok(Box::new(GitHubRepository::from_env(cfg.timeout())?))
    } else {
        info!("using local repository");
        Ok(Box::new(Git2Repository::open(".")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::git::MockRepository;

    fn released() -> MockRepository {
        let mut repo = MockRepository::new();
        repo.add_commit("a", &[]);
        repo.add_commit("b", &["a"]);
        repo.add_commit("c", &["a"]);
        repo.set_branch_head("main", "b");
        repo.set_branch_head("develop", "c");
        repo
    }

    #[test]
    fn test_dry_run_previews_without_writing() {
        let cfg = Config::default().validate().unwrap();
        let event = TransitionEvent::push("main").with_release_candidate("1.0.0");

        let result = evaluate_with_port(&event, &cfg, released(), true);
        assert_eq!(result.exit_code(), 0);
        assert_eq!(
            result.previewed,
            vec![
                FollowUpAction::CreateTag("1.0.0".to_string()),
                FollowUpAction::OpenMerge {
                    from: "main".to_string(),
                    to: "develop".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_denial_exits_nonzero() {
        let cfg = Config::default().validate().unwrap();
        let event = TransitionEvent::merge_request("feature/x", "main");

        let result = evaluate_with_port(&event, &cfg, released(), false);
        assert_eq!(result.exit_code(), 1);
        assert!(result.previewed.is_empty());
    }
}
