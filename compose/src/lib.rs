//! External tool plumbing for shipyard.
//!
//! This crate knows how to spell `docker-compose` and `git` command lines for a
//! single-host deployment and how to run them. It has no opinion on the order
//! in which they run; that lives in the `deployer` crate.

pub mod git;
pub mod invocation;
pub mod project;
pub mod runner;

pub use git::GitCheckout;
pub use invocation::Invocation;
pub use project::{ComposeProject, DEFAULT_COMPOSE_BINARY, DEFAULT_COMPOSE_FILE};
pub use runner::{
    CommandRunner, DryRunRunner, ExitOutcome, OutputStream, RunError, RunResult, SystemRunner,
    SPAWN_FAILURE_EXIT_CODE,
};
