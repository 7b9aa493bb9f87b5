//! Error types and error handling for the agent process
//!
//! Store and execution failures carry their own error types next to the
//! code that produces them (`store::StoreError`, `runner::ExecutionError`);
//! this module defines the process-level error returned from the top of the
//! control loop.

use thiserror::Error;

use crate::config::ConfigError;
use crate::store::StoreError;

/// Process-level error
///
/// Any of these terminates the agent. Script failures never appear here;
/// they are captured as job log data and the loop keeps running.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Configuration could not be read from the environment
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The startup registration insert was rejected by the store
    #[error("agent registration failed: {0}")]
    Registration(#[source] StoreError),

    /// A store call failed during the polling loop and was not recoverable
    #[error(transparent)]
    Store(#[from] StoreError),
}
