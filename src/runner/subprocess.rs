//! Runs commands as child processes

use crate::runner::{CommandInvocation, CommandOutput, CommandRunner, RunnerError};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Spawns each invocation with `tokio::process`
///
/// The child is killed if the returned future is dropped, so wrapping
/// `run` in a timeout or a cancellation `select!` terminates the process.
#[derive(Debug, Clone, Default)]
pub struct SubprocessRunner;

impl SubprocessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SubprocessRunner {
    async fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput, RunnerError> {
        debug!(
            "Spawning `{}` in {}",
            invocation.display(),
            invocation.working_dir.display()
        );

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| RunnerError::Io {
                program: invocation.program.clone(),
                source,
            })?;

        let output = CommandOutput::from(output);
        if !output.success {
            warn!(
                "`{}` exited with {:?}: {}",
                invocation.display(),
                output.exit_code,
                output.stderr.trim()
            );
        } else {
            debug!(
                "`{}` succeeded with {} bytes of output",
                invocation.display(),
                output.stdout.len()
            );
        }

        Ok(output)
    }
}
