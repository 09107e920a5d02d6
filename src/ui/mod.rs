//! Terminal output for the verdict of a run.
//!
//! Logging goes through `tracing`; this module prints the result a user reads
//! in the CI log regardless of the log level.

pub mod formatter;

pub use formatter::{
    display_boundary_warning, display_error, display_evaluation, display_status, display_success,
    format_evaluation,
};
