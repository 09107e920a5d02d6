use std::sync::Mutex;

use tracing::info;

use crate::domain::FollowUpAction;
use crate::error::PortError;
use crate::git::{CommitId, MergeRef, VersionControlPort};

/// Port decorator for previews: reads go to the wrapped port, writes are
/// only recorded.
pub struct DryRunPort<P> {
    inner: P,
    recorded: Mutex<Vec<FollowUpAction>>,
}

impl<P: VersionControlPort> DryRunPort<P> {
    pub fn new(inner: P) -> Self {
        DryRunPort {
            inner,
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// Writes that would have been performed, in order
    pub fn recorded(&self) -> Vec<FollowUpAction> {
        self.recorded
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn record(&self, action: FollowUpAction) {
        info!(action = %action, "dry run: skipped");
        match self.recorded.lock() {
            Ok(mut recorded) => recorded.push(action),
            Err(poisoned) => poisoned.into_inner().push(action),
        }
    }
}

impl<P: VersionControlPort> VersionControlPort for DryRunPort<P> {
    fn list_tags(&self) -> Result<Vec<String>, PortError> {
        self.inner.list_tags()
    }

    fn list_branches(&self) -> Result<Vec<String>, PortError> {
        self.inner.list_branches()
    }

    fn branch_head(&self, branch: &str) -> Result<CommitId, PortError> {
        self.inner.branch_head(branch)
    }

    fn find_tag_target(&self, tag: &str) -> Result<Option<CommitId>, PortError> {
        self.inner.find_tag_target(tag)
    }

    fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> Result<bool, PortError> {
        self.inner.is_ancestor(ancestor, descendant)
    }

    fn create_tag(&self, name: &str, _commit: &CommitId) -> Result<(), PortError> {
        self.record(FollowUpAction::CreateTag(name.to_string()));
        Ok(())
    }

    fn open_merge(&self, from: &str, to: &str) -> Result<MergeRef, PortError> {
        self.record(FollowUpAction::OpenMerge {
            from: from.to_string(),
            to: to.to_string(),
        });
        Ok(MergeRef {
            id: "dry run".to_string(),
            url: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;

    #[test]
    fn test_writes_are_recorded_not_applied() {
        let mut repo = MockRepository::new();
        repo.add_commit("c1", &[]);
        repo.set_branch_head("main", "c1");
        repo.set_branch_head("develop", "c1");

        let port = DryRunPort::new(repo);
        port.create_tag("v1.0.0", &CommitId::from("c1")).unwrap();
        port.open_merge("main", "develop").unwrap();

        assert_eq!(
            port.recorded(),
            vec![
                FollowUpAction::CreateTag("v1.0.0".to_string()),
                FollowUpAction::OpenMerge {
                    from: "main".to_string(),
                    to: "develop".to_string()
                },
            ]
        );
        assert!(port.list_tags().unwrap().is_empty());
        assert_eq!(port.branch_head("main").unwrap(), CommitId::from("c1"));
    }
}
