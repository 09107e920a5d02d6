//! Command-line surface: arguments, CI event context, and the workflow that
//! ties configuration, repository port, and engine together.

pub mod args;
pub mod context;
pub mod orchestration;

pub use args::{Args, Backend};
pub use context::EventContext;
pub use orchestration::{run_workflow, WorkflowArgs, WorkflowResult};
