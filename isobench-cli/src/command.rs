//! External command work unit
//!
//! The CLI measures how long it takes to spawn a command and wait for it.

use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

/// Errors raised while running the measured command
#[derive(Debug, Error)]
pub enum CommandError {
    /// No program was given
    #[error("no command given")]
    Empty,

    /// The program could not be started
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Program name
        program: String,
        /// Underlying spawn error
        source: std::io::Error,
    },

    /// The program exited unsuccessfully
    #[error("`{program}` exited with {status}")]
    Failed {
        /// Program name
        program: String,
        /// Exit status reported by the OS
        status: ExitStatus,
    },
}

/// A command line to spawn once per trial
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    program: String,
    args: Vec<String>,
}

impl ShellCommand {
    /// Build from an argv list; the first element is the program
    pub fn new(argv: &[String]) -> Result<Self, CommandError> {
        let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Program name
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Spawn the command with its output discarded and wait for it
    pub fn run(&self) -> Result<(), CommandError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| CommandError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(CommandError::Failed {
                program: self.program.clone(),
                status,
            })
        }
    }
}
