//! Shell command execution.
//!
//! `CommandRunner` is the only seam through which the rest of the crate
//! touches external processes. `ShellRunner` is the real implementation;
//! tests substitute a scripted runner.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;

use thiserror::Error;

use crate::journal::{Journal, MAIN_LOG};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("failed to start shell: {0}")]
    Spawn(String),

    #[error("failed to pass command to shell: {0}")]
    Stdin(String),

    #[error("command exited with {}", describe_code(.code))]
    Exit { code: Option<i32> },

    #[error("command task aborted: {0}")]
    Aborted(String),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Captured result of one command. Output is kept even on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub error: Option<ExecError>,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            error: None,
        }
    }

    pub fn failure(stdout: impl Into<String>, stderr: impl Into<String>, error: ExecError) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<(String, String), ExecError> {
        match self.error {
            None => Ok((self.stdout, self.stderr)),
            Some(err) => Err(err),
        }
    }
}

/// Runs a full command line to completion, blocking the caller.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str) -> CommandOutput;
}

/// Feeds command lines to the system shell on stdin.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    journal: Arc<Journal>,
    shell: String,
}

impl ShellRunner {
    pub fn new(journal: Arc<Journal>) -> Self {
        Self {
            journal,
            shell: default_shell().to_string(),
        }
    }

    /// Use a different shell binary (it must read commands from stdin).
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    fn execute(&self, command: &str) -> CommandOutput {
        let mut child = match Command::new(&self.shell)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                return CommandOutput::failure("", "", ExecError::Spawn(err.to_string()));
            }
        };

        // Dropping stdin closes it so the shell sees EOF after the command.
        let fed = match child.stdin.take() {
            Some(mut stdin) => stdin
                .write_all(command.as_bytes())
                .and_then(|()| stdin.write_all(b"\n"))
                .map_err(|err| ExecError::Stdin(err.to_string())),
            None => Err(ExecError::Stdin("stdin was not captured".to_string())),
        };

        let output = match child.wait_with_output() {
            Ok(output) => output,
            Err(err) => {
                return CommandOutput::failure("", "", ExecError::Spawn(err.to_string()));
            }
        };
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if let Err(err) = fed {
            return CommandOutput::failure(stdout, stderr, err);
        }
        if !output.status.success() {
            let code = output.status.code();
            return CommandOutput::failure(stdout, stderr, ExecError::Exit { code });
        }
        CommandOutput::success(stdout, stderr)
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> CommandOutput {
        tracing::debug!(command, "running");
        let output = self.execute(command);
        match &output.error {
            Some(err) => self.journal.record(
                MAIN_LOG,
                &[
                    "command failed:",
                    command,
                    err.to_string().as_str(),
                    output.stderr.as_str(),
                    output.stdout.as_str(),
                ],
            ),
            None => self.journal.record(
                MAIN_LOG,
                &[format!(
                    "command succeeded: {command}\nout:\n{}\nerr:{}\n",
                    output.stdout, output.stderr
                )],
            ),
        }
        output
    }
}

#[cfg(windows)]
fn default_shell() -> &'static str {
    "powershell"
}

#[cfg(not(windows))]
fn default_shell() -> &'static str {
    "/bin/bash"
}
