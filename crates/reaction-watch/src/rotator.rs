//! Round-robin action rotation.
//!
//! Commands are split on whitespace into a program and its arguments. There
//! is no shell interpretation and no quoting, so an argument containing a
//! space cannot be expressed.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use reaction_core::Target;

use crate::error::ActionError;

/// Outcome of one action run.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Index of the action that ran.
    pub index: usize,
    pub command_line: String,
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Exit code, when the program ran to completion.
    pub exit_code: Option<i32>,
    pub error: Option<ActionError>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Owns the remediation commands and the rotation cursor.
///
/// Not reentrant: callers must ensure a single `run_next` at a time.
#[derive(Debug)]
pub struct ActionRotator {
    actions: Vec<String>,
    /// Index of the last action run; `None` before the first.
    cursor: Option<usize>,
}

impl ActionRotator {
    /// Create a rotator whose first action is `actions[0]`.
    pub fn new(actions: Vec<String>) -> Result<Self, ActionError> {
        Self::starting_at(actions, 0)
    }

    /// Create a rotator whose first action is `actions[first % len]`.
    ///
    /// Fails with [`ActionError::NoActions`] when `actions` is empty.
    pub fn starting_at(actions: Vec<String>, first: usize) -> Result<Self, ActionError> {
        if actions.is_empty() {
            return Err(ActionError::NoActions);
        }
        let cursor = match first % actions.len() {
            0 => None,
            n => Some(n - 1),
        };
        Ok(Self { actions, cursor })
    }

    pub fn from_target(target: &Target) -> Result<Self, ActionError> {
        Self::starting_at(target.actions.clone(), target.initial_index)
    }

    /// Index of the last action run, if any.
    pub fn current(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Move the cursor forward one slot, wrapping at the end.
    pub fn advance(&mut self) -> usize {
        let next = match self.cursor {
            None => 0,
            Some(i) => (i + 1) % self.actions.len(),
        };
        self.cursor = Some(next);
        next
    }

    /// Advance and run the selected action to completion.
    ///
    /// The cursor moves even when the action fails, so a broken action is
    /// skipped on the next trigger rather than retried.
    pub async fn run_next(&mut self) -> ExecutionResult {
        let index = self.advance();
        let command_line = self.actions[index].clone();

        info!(index, command = %command_line, "executing action");

        let (stdout, exit_code, error) = match execute(&command_line).await {
            Ok(output) => output,
            Err(e) => (String::new(), None, Some(e)),
        };

        ExecutionResult {
            index,
            command_line,
            stdout,
            exit_code,
            error,
        }
    }
}

/// Split a command line into program and arguments.
pub fn split_command(line: &str) -> Option<(&str, Vec<&str>)> {
    let mut parts = line.split_whitespace();
    let program = parts.next()?;
    Some((program, parts.collect()))
}

type Captured = (String, Option<i32>, Option<ActionError>);

async fn execute(command_line: &str) -> Result<Captured, ActionError> {
    let (program, args) = split_command(command_line).ok_or(ActionError::EmptyCommand)?;

    let output = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| ActionError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    debug!(%program, status = %output.status, bytes = output.stdout.len(), "action exited");

    let error = if output.status.success() {
        None
    } else {
        Some(ActionError::ExitStatus {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    };

    Ok((stdout, output.status.code(), error))
}
