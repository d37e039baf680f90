//! Command runner abstraction for executing admin commands.
//!
//! `CommandRunner` is the trait `CephCli` uses to run the `ceph` tool.
//! `ProcessRunner` is the production implementation that spawns the program directly.
//! `MockRunner` is the test double that records calls and returns preset responses.

use std::process::Command;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::CephError;

/// Trait for executing a program with arguments and capturing stdout.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> Result<String, CephError>;
}

/// Render a command line for logs and error messages.
pub fn display_command(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Production runner. No shell is involved, so arguments need no quoting.
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<String, CephError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| CephError::Spawn {
                command: display_command(program, args),
                source,
            })?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(CephError::CommandFailed {
                command: display_command(program, args),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Test-double runner that records commands and returns pre-configured responses.
///
/// Clones share the same queue and history.
#[derive(Clone, Default)]
pub struct MockRunner {
    responses: Arc<Mutex<Vec<Result<String, String>>>>,
    commands: Arc<Mutex<Vec<String>>>,
}

impl MockRunner {
    pub fn with_responses(responses: Vec<Result<String, String>>) -> Self {
        let mut reversed = responses;
        reversed.reverse();
        MockRunner {
            responses: Arc::new(Mutex::new(reversed)),
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn new() -> Self {
        Self::default()
    }

    pub fn executed_commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<String, CephError> {
        let command = display_command(program, args);
        self.commands.lock().push(command.clone());
        match self.responses.lock().pop() {
            Some(Ok(stdout)) => Ok(stdout),
            Some(Err(stderr)) => Err(CephError::CommandFailed { command, stderr }),
            None => Ok(String::new()),
        }
    }
}
