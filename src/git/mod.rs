//! Version-control port
//!
//! The engine never talks to a repository directly. Everything it needs to
//! know or change goes through the [VersionControlPort] trait, so the policy
//! logic can be exercised against an in-memory repository.
//!
//! # Implementations
//!
//! - [repository::Git2Repository]: a local repository through the `git2` crate
//! - [github::GitHubRepository]: a hosted repository through the GitHub REST API
//! - [dry_run::DryRunPort]: wraps another port and records writes instead of performing them
//! - [mock::MockRepository]: an in-memory commit graph for tests
//!
//! ```rust
//! # use gitflow_guard::git::VersionControlPort;
//! # fn example<P: VersionControlPort>(port: &P) -> Result<(), gitflow_guard::error::PortError> {
//! let main = port.branch_head("main")?;
//! for tag in port.list_tags()? {
//!     if let Some(commit) = port.find_tag_target(&tag)? {
//!         println!("{} reachable from main: {}", tag, port.is_ancestor(&commit, &main)?);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod dry_run;
pub mod github;
pub mod mock;
pub mod repository;

pub use dry_run::DryRunPort;
pub use github::GitHubRepository;
pub use mock::MockRepository;
pub use repository::Git2Repository;

use std::fmt;

use crate::error::PortError;

/// Full hex id of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitId(String);

impl CommitId {
    pub fn new(id: impl Into<String>) -> Self {
        CommitId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First seven characters, for messages
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommitId {
    fn from(id: &str) -> Self {
        CommitId::new(id)
    }
}

impl From<String> for CommitId {
    fn from(id: String) -> Self {
        CommitId(id)
    }
}

impl From<git2::Oid> for CommitId {
    fn from(oid: git2::Oid) -> Self {
        CommitId(oid.to_string())
    }
}

/// Handle to an opened (or already existing) merge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRef {
    /// Pull request number, or a description for ports without merge requests
    pub id: String,
    pub url: Option<String>,
}

impl fmt::Display for MergeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.url {
            Some(url) => write!(f, "{} ({})", self.id, url),
            None => f.write_str(&self.id),
        }
    }
}

/// Queries and commands the engine issues against a repository.
///
/// Implementations must bound every call by their configured timeout and
/// report an expired call as [PortError::Timeout].
pub trait VersionControlPort: Send + Sync {
    /// Names of all tags
    fn list_tags(&self) -> Result<Vec<String>, PortError>;

    /// Names of all branches
    fn list_branches(&self) -> Result<Vec<String>, PortError>;

    /// Commit at the tip of a branch; [PortError::NotFound] if it does not exist
    fn branch_head(&self, branch: &str) -> Result<CommitId, PortError>;

    fn branch_exists(&self, branch: &str) -> Result<bool, PortError> {
        match self.branch_head(branch) {
            Ok(_) => Ok(true),
            Err(PortError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Commit a tag points at (annotated tags are peeled), or `None` if absent
    fn find_tag_target(&self, tag: &str) -> Result<Option<CommitId>, PortError>;

    /// True when `ancestor` is reachable from `descendant` (a commit is its own ancestor)
    fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> Result<bool, PortError>;

    /// Create a tag at `commit`.
    ///
    /// Idempotent: an existing tag at the same commit is success; an existing
    /// tag elsewhere is [PortError::Conflict].
    fn create_tag(&self, name: &str, commit: &CommitId) -> Result<(), PortError>;

    /// Request that `from` be merged into `to`, returning an already-open
    /// request for the same pair instead of opening a duplicate.
    fn open_merge(&self, from: &str, to: &str) -> Result<MergeRef, PortError>;
}

impl<P: VersionControlPort + ?Sized> VersionControlPort for Box<P> {
    fn list_tags(&self) -> Result<Vec<String>, PortError> {
        (**self).list_tags()
    }

    fn list_branches(&self) -> Result<Vec<String>, PortError> {
        (**self).list_branches()
    }

    fn branch_head(&self, branch: &str) -> Result<CommitId, PortError> {
        (**self).branch_head(branch)
    }

    fn branch_exists(&self, branch: &str) -> Result<bool, PortError> {
        (**self).branch_exists(branch)
    }

    fn find_tag_target(&self, tag: &str) -> Result<Option<CommitId>, PortError> {
        (**self).find_tag_target(tag)
    }

    fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> Result<bool, PortError> {
        (**self).is_ancestor(ancestor, descendant)
    }

    fn create_tag(&self, name: &str, commit: &CommitId) -> Result<(), PortError> {
        (**self).create_tag(name, commit)
    }

    fn open_merge(&self, from: &str, to: &str) -> Result<MergeRef, PortError> {
        (**self).open_merge(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_id_short() {
        let id = CommitId::new("0123456789abcdef");
        assert_eq!(id.short(), "0123456");
        assert_eq!(CommitId::new("abc").short(), "abc");
    }

    #[test]
    fn test_branch_exists_maps_not_found() {
        let mut repo = MockRepository::new();
        repo.add_commit("c1", &[]);
        repo.set_branch_head("main", "c1");

        assert!(repo.branch_exists("main").unwrap());
        assert!(!repo.branch_exists("develop").unwrap());
    }
}
