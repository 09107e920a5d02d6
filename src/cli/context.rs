//! Event context from the GitHub Actions environment.

use std::env;
use std::fs;

use serde::Deserialize;
use tracing::debug;

use crate::boundary::BoundaryWarning;
use crate::domain::TransitionEvent;
use crate::error::{GitFlowError, Result};

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    pull_request: PullRequest,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    head: PullRequestRef,
    base: PullRequestRef,
}

#[derive(Debug, Deserialize)]
struct PullRequestRef {
    #[serde(rename = "ref")]
    name: String,
    #[serde(default)]
    sha: Option<String>,
}

/// What the CI run is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventContext {
    Event(TransitionEvent),
    /// Nothing to evaluate; the run is an allowed no-op
    Ignored(BoundaryWarning),
}

impl EventContext {
    /// Read the event from the process environment.
    ///
    /// `develop_branch` is the ref assumed for a push when `GITHUB_REF` is unset.
    pub fn from_env(develop_branch: &str) -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok(), develop_branch)
    }

    /// Same as [`EventContext::from_env`] with a custom variable lookup
    pub fn from_lookup<F>(lookup: F, develop_branch: &str) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let event_name = lookup("GITHUB_EVENT_NAME").unwrap_or_else(|| "push".to_string());
        debug!(event = %event_name, "reading event context");

        match event_name.as_str() {
            "pull_request" | "pull_request_target" => {
                let path = lookup("GITHUB_EVENT_PATH").ok_or_else(|| {
                    GitFlowError::event("GITHUB_EVENT_PATH is not set for a pull request event")
                })?;
                let payload: PullRequestPayload = serde_json::from_str(&fs::read_to_string(&path)?)?;
                let head = payload.pull_request.head;

                let mut event = TransitionEvent::merge_request(head.name, payload.pull_request.base.name);
                if let Some(sha) = head.sha.filter(|s| !s.is_empty()) {
                    event = event.with_source_tip(sha);
                }
                Ok(EventContext::Event(event))
            }
            "push" => {
                let reference = lookup("GITHUB_REF").unwrap_or_else(|| develop_branch.to_string());
                if reference.starts_with("refs/tags/") {
                    return Ok(EventContext::Ignored(BoundaryWarning::TagPush { reference }));
                }

                let mut event = TransitionEvent::push(branch_from_ref(&reference));
                if let Some(sha) = lookup("GITHUB_SHA").filter(|s| !s.is_empty()) {
                    event = event.with_source_tip(sha);
                }
                Ok(EventContext::Event(event))
            }
            _ => Ok(EventContext::Ignored(BoundaryWarning::UnsupportedEvent {
                event: event_name,
            })),
        }
    }
}

/// `refs/heads/release/1.0` -> `release/1.0`; a bare name is kept as is.
fn branch_from_ref(reference: &str) -> &str {
    if !reference.starts_with("refs/") {
        return reference;
    }
    reference.splitn(3, '/').nth(2).unwrap_or(reference)
}
