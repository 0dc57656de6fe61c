//! External command execution

pub mod invocation;
pub mod output;
pub mod subprocess;

use async_trait::async_trait;
pub use invocation::CommandInvocation;
pub use output::{CommandOutput, RunnerError};
pub use subprocess::SubprocessRunner;

/// Trait for running one external command - allows for different implementations
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion and capture its output
    ///
    /// A non-zero exit is not an error here; it is reported through
    /// `CommandOutput::success`. Errors mean the process could not be
    /// started or waited on.
    async fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput, RunnerError>;
}

#[async_trait]
impl<R: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<R> {
    async fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput, RunnerError> {
        (**self).run(invocation).await
    }
}
