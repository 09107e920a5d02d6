//! Domain logic - pure GitFlow values, independent of any repository

pub mod branch;
pub mod event;
pub mod tag;
pub mod version;

pub use branch::{classify, BranchKind, BranchRole};
pub use event::{
    ActionOutcome, CompletedAction, Decision, Evaluation, EventKind, FailedStep, FollowUpAction,
    TransitionEvent,
};
pub use tag::{classify_tag, format_tag};
pub use version::SemVer;
