pub mod boundary;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod orchestrator;
pub mod policy;
pub mod resolver;
pub mod ui;

pub use error::{GitFlowError, Result};
pub use orchestrator::evaluate;
