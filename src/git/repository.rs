use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use git2::{BranchType, ErrorClass, ErrorCode, Oid, Repository as Git2Repo};
use tracing::{debug, info};

use crate::error::{PortError, Result};
use crate::git::{CommitId, MergeRef, VersionControlPort};

const REMOTE: &str = "origin";

/// Port over a local repository.
///
/// Calls never leave the machine, so the configured timeout does not apply.
/// There are no merge requests locally: [VersionControlPort::open_merge]
/// fast-forwards the target branch when possible and reports a conflict otherwise.
pub struct Git2Repository {
    repo: Mutex<Git2Repo>,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository::from_git2(repo))
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository {
            repo: Mutex::new(repo),
        }
    }

    fn repo(&self) -> MutexGuard<'_, Git2Repo> {
        self.repo.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Head of `branch`, falling back to its `origin` remote-tracking branch
    /// when there is no local one (CI checkouts usually have a single local branch).
    fn head_oid(repo: &Git2Repo, branch: &str) -> std::result::Result<Oid, PortError> {
        let branch_ref = match repo.find_branch(branch, BranchType::Local) {
            Err(e) if e.code() == ErrorCode::NotFound => {
                debug!(branch, "no local branch, trying {}", REMOTE);
                repo.find_branch(&format!("{}/{}", REMOTE, branch), BranchType::Remote)
            }
            found => found,
        }
        .map_err(|e| port_error(&format!("branch '{}'", branch), e))?;

        branch_ref
            .get()
            .target()
            .ok_or_else(|| PortError::other(format!("branch '{}' has no target", branch)))
    }

    fn tag_oid(repo: &Git2Repo, tag: &str) -> std::result::Result<Option<Oid>, PortError> {
        match repo.find_reference(&format!("refs/tags/{}", tag)) {
            Ok(reference) => {
                let commit = reference
                    .peel_to_commit()
                    .map_err(|e| port_error(&format!("tag '{}'", tag), e))?;
                Ok(Some(commit.id()))
            }
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(port_error(&format!("tag '{}'", tag), e)),
        }
    }
}

fn parse_oid(id: &CommitId) -> std::result::Result<Oid, PortError> {
    Oid::from_str(id.as_str()).map_err(|e| PortError::other(format!("invalid commit id '{}': {}", id, e)))
}

/// Map a git2 error onto the port's error kinds
fn port_error(context: &str, e: git2::Error) -> PortError {
    let msg = format!("{}: {}", context, e.message());
    match e.code() {
        ErrorCode::NotFound => PortError::NotFound(msg),
        ErrorCode::Exists | ErrorCode::NotFastForward | ErrorCode::Locked | ErrorCode::Conflict => {
            PortError::Conflict(msg)
        }
        ErrorCode::Auth | ErrorCode::Certificate => PortError::Unauthorized(msg),
        _ if e.class() == ErrorClass::Ssh => PortError::Unauthorized(msg),
        _ => PortError::Other(msg),
    }
}

impl VersionControlPort for Git2Repository {
    fn list_tags(&self) -> std::result::Result<Vec<String>, PortError> {
        let repo = self.repo();
        let tags = repo.tag_names(None).map_err(|e| port_error("list tags", e))?;

        Ok(tags.iter().flatten().map(|s| s.to_string()).collect())
    }

    fn list_branches(&self) -> std::result::Result<Vec<String>, PortError> {
        let repo = self.repo();
        let branches = repo
            .branches(None)
            .map_err(|e| port_error("list branches", e))?;

        let remote_prefix = format!("{}/", REMOTE);
        let mut local = Vec::new();
        let mut tracking = Vec::new();
        for entry in branches {
            let (branch, kind) = entry.map_err(|e| port_error("list branches", e))?;
            let Some(name) = branch.name().map_err(|e| port_error("list branches", e))? else {
                continue;
            };
            match kind {
                BranchType::Local => local.push(name.to_string()),
                BranchType::Remote => {
                    if let Some(name) = name.strip_prefix(&remote_prefix) {
                        if name != "HEAD" {
                            tracking.push(name.to_string());
                        }
                    }
                }
            }
        }

        // Remote-tracking branches only count where there is no local branch
        tracking.retain(|name| !local.contains(name));
        local.extend(tracking);
        Ok(local)
    }

    fn branch_head(&self, branch: &str) -> std::result::Result<CommitId, PortError> {
        let repo = self.repo();
        Self::head_oid(&repo, branch).map(CommitId::from)
    }

    fn find_tag_target(&self, tag: &str) -> std::result::Result<Option<CommitId>, PortError> {
        let repo = self.repo();
        Ok(Self::tag_oid(&repo, tag)?.map(CommitId::from))
    }

    fn is_ancestor(
        &self,
        ancestor: &CommitId,
        descendant: &CommitId,
    ) -> std::result::Result<bool, PortError> {
        if ancestor == descendant {
            return Ok(true);
        }
        let repo = self.repo();
        repo.graph_descendant_of(parse_oid(descendant)?, parse_oid(ancestor)?)
            .map_err(|e| port_error("ancestry check", e))
    }

    fn create_tag(&self, name: &str, commit: &CommitId) -> std::result::Result<(), PortError> {
        let repo = self.repo();
        let oid = parse_oid(commit)?;

        match Self::tag_oid(&repo, name)? {
            Some(existing) if existing == oid => {
                debug!(tag = name, "tag already present");
                return Ok(());
            }
            Some(existing) => {
                return Err(PortError::conflict(format!(
                    "tag '{}' already points at {}",
                    name, existing
                )))
            }
            None => {}
        }

        let object = repo
            .find_object(oid, None)
            .map_err(|e| port_error(&format!("commit {}", commit), e))?;
        repo.tag_lightweight(name, &object, false)
            .map_err(|e| port_error(&format!("create tag '{}'", name), e))?;

        info!(tag = name, commit = %commit, "created tag");
        Ok(())
    }

    fn open_merge(&self, from: &str, to: &str) -> std::result::Result<MergeRef, PortError> {
        let repo = self.repo();
        let from_oid = Self::head_oid(&repo, from)?;
        let to_oid = Self::head_oid(&repo, to)?;

        let up_to_date = from_oid == to_oid
            || repo
                .graph_descendant_of(to_oid, from_oid)
                .map_err(|e| port_error("ancestry check", e))?;
        if up_to_date {
            return Ok(MergeRef {
                id: format!("{} already contains {}", to, from),
                url: None,
            });
        }

        let can_fast_forward = repo
            .graph_descendant_of(from_oid, to_oid)
            .map_err(|e| port_error("ancestry check", e))?;
        if !can_fast_forward {
            return Err(PortError::conflict(format!(
                "'{}' has diverged from '{}' and must be merged manually",
                to, from
            )));
        }

        // Moving the checked-out branch would leave the work tree stale
        if let Ok(head) = repo.head() {
            if head.is_branch() && head.shorthand() == Some(to) {
                return Err(PortError::conflict(format!(
                    "'{}' is checked out; cannot fast-forward it in place",
                    to
                )));
            }
        }

        let message = format!("fast-forward from {}", from);
        let local_ref = format!("refs/heads/{}", to);
        match repo.find_reference(&local_ref) {
            Ok(mut reference) => reference.set_target(from_oid, &message).map(|_| ()),
            // Only a remote-tracking branch exists: create the local one at its new head
            Err(e) if e.code() == ErrorCode::NotFound => {
                repo.reference(&local_ref, from_oid, false, &message).map(|_| ())
            }
            Err(e) => Err(e),
        }
        .map_err(|e| port_error(&format!("update branch '{}'", to), e))?;

        info!(from, to, "fast-forwarded branch");
        Ok(MergeRef {
            id: format!("fast-forward {} to {}", to, CommitId::from(from_oid).short()),
            url: None,
        })
    }
}
