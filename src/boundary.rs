use std::fmt;

/// Warnings raised while evaluating an event.
/// These are non-fatal issues that should be reported to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryWarning {
    /// Release candidate differs from the version encoded in the branch name
    ReleaseCandidateMismatch { branch: String, candidate: String },
    /// Tag exists but cannot be parsed as a version; it is skipped
    IgnoredTag { tag: String },
    /// The CI event is not one the engine acts on
    UnsupportedEvent { event: String },
    /// A tag was pushed; only branch pushes are evaluated
    TagPush { reference: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::ReleaseCandidateMismatch { branch, candidate } => write!(
                f,
                "Branch is called '{}' but release candidate is '{}'",
                branch, candidate
            ),
            BoundaryWarning::IgnoredTag { tag } => {
                write!(f, "Tag '{}' is not a version tag and was ignored", tag)
            }
            BoundaryWarning::UnsupportedEvent { event } => {
                write!(f, "Nothing implemented for '{}' events", event)
            }
            BoundaryWarning::TagPush { reference } => {
                write!(f, "Nothing implemented for pushing tags ({})", reference)
            }
        }
    }
}
