//! Error types for remediation actions.

use std::process::ExitStatus;

use thiserror::Error;

/// Why an action did not complete successfully.
///
/// Apart from [`ActionError::NoActions`], which rejects an empty action
/// list at construction, these never stop the watchdog. They are carried
/// in the [`ExecutionResult`](crate::rotator::ExecutionResult) and logged.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("no actions configured")]
    NoActions,

    #[error("action command is empty")]
    EmptyCommand,

    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("action failed with {status}: {stderr}")]
    ExitStatus { status: ExitStatus, stderr: String },
}
