use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::error::PortError;
use crate::git::{CommitId, MergeRef, VersionControlPort};

/// Port operations, for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    ListTags,
    ListBranches,
    BranchHead,
    FindTagTarget,
    IsAncestor,
    CreateTag,
    OpenMerge,
}

/// In-memory repository for testing without actual git operations
///
/// Holds a commit graph, branch heads, tags, and opened merge requests.
/// Writes go through interior mutability so the port can be shared like a
/// real one.
pub struct MockRepository {
    parents: HashMap<CommitId, Vec<CommitId>>,
    branches: BTreeMap<String, CommitId>,
    tags: Mutex<BTreeMap<String, CommitId>>,
    merges: Mutex<Vec<(String, String)>>,
    tag_writes: Mutex<Vec<String>>,
    failures: Mutex<HashMap<MockOp, PortError>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        MockRepository {
            parents: HashMap::new(),
            branches: BTreeMap::new(),
            tags: Mutex::new(BTreeMap::new()),
            merges: Mutex::new(Vec::new()),
            tag_writes: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Add a commit with the given parents
    pub fn add_commit(&mut self, id: impl Into<CommitId>, parents: &[&str]) {
        self.parents
            .insert(id.into(), parents.iter().map(|&p| CommitId::from(p)).collect());
    }

    /// Set a branch head
    pub fn set_branch_head(&mut self, branch: impl Into<String>, id: impl Into<CommitId>) {
        self.branches.insert(branch.into(), id.into());
    }

    /// Add a tag pointing to a commit
    pub fn add_tag(&mut self, name: impl Into<String>, id: impl Into<CommitId>) {
        lock(&self.tags).insert(name.into(), id.into());
    }

    /// Make every subsequent call of `op` fail with `error`
    pub fn fail_on(&self, op: MockOp, error: PortError) {
        lock(&self.failures).insert(op, error);
    }

    pub fn clear_failure(&self, op: MockOp) {
        lock(&self.failures).remove(&op);
    }

    /// Current tags and their commits
    pub fn tags(&self) -> BTreeMap<String, CommitId> {
        lock(&self.tags).clone()
    }

    /// Merge requests opened so far, as (from, to) pairs
    pub fn merges(&self) -> Vec<(String, String)> {
        lock(&self.merges).clone()
    }

    /// Tag names actually written, in order; repeated idempotent calls do not appear
    pub fn tag_writes(&self) -> Vec<String> {
        lock(&self.tag_writes).clone()
    }

    fn check(&self, op: MockOp) -> Result<(), PortError> {
        match lock(&self.failures).get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionControlPort for MockRepository {
    fn list_tags(&self) -> Result<Vec<String>, PortError> {
        self.check(MockOp::ListTags)?;
        Ok(lock(&self.tags).keys().cloned().collect())
    }

    fn list_branches(&self) -> Result<Vec<String>, PortError> {
        self.check(MockOp::ListBranches)?;
        Ok(self.branches.keys().cloned().collect())
    }

    fn branch_head(&self, branch: &str) -> Result<CommitId, PortError> {
        self.check(MockOp::BranchHead)?;
        self.branches
            .get(branch)
            .cloned()
            .ok_or_else(|| PortError::not_found(format!("branch '{}'", branch)))
    }

    fn find_tag_target(&self, tag: &str) -> Result<Option<CommitId>, PortError> {
        self.check(MockOp::FindTagTarget)?;
        Ok(lock(&self.tags).get(tag).cloned())
    }

    fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> Result<bool, PortError> {
        self.check(MockOp::IsAncestor)?;
        if !self.parents.contains_key(descendant) {
            return Err(PortError::not_found(format!("commit {}", descendant)));
        }

        let mut seen = HashSet::new();
        let mut stack = vec![descendant];
        while let Some(current) = stack.pop() {
            if current == ancestor {
                return Ok(true);
            }
            if seen.insert(current) {
                if let Some(parents) = self.parents.get(current) {
                    stack.extend(parents.iter());
                }
            }
        }
        Ok(false)
    }

    fn create_tag(&self, name: &str, commit: &CommitId) -> Result<(), PortError> {
        self.check(MockOp::CreateTag)?;
        if !self.parents.contains_key(commit) {
            return Err(PortError::not_found(format!("commit {}", commit)));
        }

        let mut tags = lock(&self.tags);
        match tags.get(name) {
            Some(existing) if existing == commit => Ok(()),
            Some(existing) => Err(PortError::conflict(format!(
                "tag '{}' already points at {}",
                name,
                existing.short()
            ))),
            None => {
                tags.insert(name.to_string(), commit.clone());
                lock(&self.tag_writes).push(name.to_string());
                Ok(())
            }
        }
    }

    fn open_merge(&self, from: &str, to: &str) -> Result<MergeRef, PortError> {
        self.check(MockOp::OpenMerge)?;
        for branch in [from, to] {
            if !self.branches.contains_key(branch) {
                return Err(PortError::not_found(format!("branch '{}'", branch)));
            }
        }

        let mut merges = lock(&self.merges);
        let index = match merges.iter().position(|(f, t)| f == from && t == to) {
            Some(index) => index,
            None => {
                merges.push((from.to_string(), to.to_string()));
                merges.len() - 1
            }
        };
        Ok(MergeRef {
            id: format!("#{}", index + 1),
            url: None,
        })
    }
}
