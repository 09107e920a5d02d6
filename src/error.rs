use thiserror::Error;

use crate::domain::BranchKind;

/// Unified error type for gitflow-guard operations
#[derive(Error, Debug)]
pub enum GitFlowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Repository operation failed: {0}")]
    Port(#[from] PortError),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Event context error: {0}")]
    Event(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid event payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Convenience type alias for Results in gitflow-guard
pub type Result<T> = std::result::Result<T, GitFlowError>;

impl GitFlowError {
    /// Create an event context error
    pub fn event(msg: impl Into<String>) -> Self {
        GitFlowError::Event(msg.into())
    }
}

/// Invalid configuration. Always fatal: nothing touches the repository after one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{role} branch name must not be empty")]
    EmptyBranchName { role: &'static str },

    #[error("main and develop branches are both named '{0}'")]
    DuplicateBranchName(String),

    #[error("prefix '{prefix}' is configured for both {first} and {second} branches")]
    DuplicatePrefix {
        prefix: String,
        first: BranchKind,
        second: BranchKind,
    },

    #[error("{shorter} prefix '{shorter_prefix}' is a prefix of {longer} prefix '{longer_prefix}'")]
    OverlappingPrefix {
        shorter: BranchKind,
        shorter_prefix: String,
        longer: BranchKind,
        longer_prefix: String,
    },

    #[error("port timeout must be greater than zero")]
    InvalidTimeout,
}

/// A branch name that cannot take part in any transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("branch '{0}' does not follow naming conventions")]
    Unrecognized(String),

    #[error("branch '{name}' is malformed: {kind} branches need a name after the prefix")]
    EmptySuffix { name: String, kind: BranchKind },
}

/// A well-formed transition that the rule table does not permit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyDenied {
    #[error("{from} -> {to} not permitted")]
    Disallowed { from: BranchKind, to: BranchKind },

    #[error("merge request from '{0}' has no target branch")]
    MissingTarget(String),

    #[error("'{branch}' is not in the lineage of '{target}'")]
    Lineage { branch: String, target: String },
}

/// Failure to compute or apply a version tag.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("no version tag is reachable from '{0}'")]
    NoBaseline(String),

    #[error("tag '{tag}' already exists on {existing}, expected {expected}")]
    TagConflict {
        tag: String,
        existing: String,
        expected: String,
    },

    #[error("malformed version: {0}")]
    Malformed(String),
}

impl VersionError {
    /// Create a malformed version error with context
    pub fn malformed(msg: impl Into<String>) -> Self {
        VersionError::Malformed(msg.into())
    }
}

/// Failure reported by a version-control port.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Other(String),
}

impl PortError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        PortError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        PortError::Conflict(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        PortError::Other(msg.into())
    }
}

/// Failure of a single follow-up step, reported alongside the decision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Port(#[from] PortError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GitFlowError::from(ConfigError::InvalidTimeout);
        assert_eq!(
            err.to_string(),
            "Configuration error: port timeout must be greater than zero"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GitFlowError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_disallowed_pair_message() {
        let err = PolicyDenied::Disallowed {
            from: BranchKind::Feature,
            to: BranchKind::Main,
        };
        assert_eq!(err.to_string(), "feature -> main not permitted");
    }

    #[test]
    fn test_overlapping_prefix_message() {
        let err = ConfigError::OverlappingPrefix {
            shorter: BranchKind::Feature,
            shorter_prefix: "f".to_string(),
            longer: BranchKind::Bugfix,
            longer_prefix: "fix/".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "feature prefix 'f' is a prefix of bugfix prefix 'fix/'"
        );
    }

    #[test]
    fn test_step_error_is_transparent() {
        let err: StepError = PortError::Timeout("GET /tags".to_string()).into();
        assert_eq!(err.to_string(), "timed out: GET /tags");

        let err: StepError = VersionError::NoBaseline("main".to_string()).into();
        assert_eq!(err.to_string(), "no version tag is reachable from 'main'");
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        let error_pairs = vec![
            (
                GitFlowError::from(ConfigError::InvalidTimeout),
                "Configuration error",
            ),
            (
                GitFlowError::from(PortError::other("x")),
                "Repository operation failed",
            ),
            (GitFlowError::event("x"), "Event context error"),
        ];

        for (err, expected_prefix) in error_pairs {
            let msg = err.to_string();
            assert!(
                msg.starts_with(expected_prefix),
                "Error message should start with '{}', but got '{}'",
                expected_prefix,
                msg
            );
        }
    }
}
