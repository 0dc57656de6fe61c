//! Step executor - runs a single step through the command runner

use crate::{
    core::{PipelineContext, Step, StepFailure},
    runner::{CommandOutput, CommandRunner},
};
use tokio::sync::watch;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

/// Result of executing a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Process exited successfully
    Success { output: CommandOutput },
    /// Step failed; output is present when the process ran to completion
    Failed {
        failure: StepFailure,
        output: Option<CommandOutput>,
    },
}

/// Executes a single step
pub struct StepExecutor<R> {
    runner: R,
}

/// Resolves once the signal flips to `true`; never resolves if the sender is gone
async fn cancelled(signal: &mut watch::Receiver<bool>) {
    if signal.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

impl<R: CommandRunner> StepExecutor<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Execute a step and return the result
    ///
    /// The process is killed when the step's timeout elapses or when
    /// `cancel` flips to `true`; both are reported as failures.
    pub async fn execute(
        &self,
        step: &Step,
        context: &PipelineContext,
        cancel: Option<watch::Receiver<bool>>,
    ) -> ExecutionResult {
        let invocation = step.invocation(&context.working_dir, &context.variables);
        info!("Executing step {}: {}", step.id, invocation.display());

        let run = timeout(
            Duration::from_secs(step.timeout_secs),
            self.runner.run(&invocation),
        );

        let result = match cancel {
            Some(mut signal) => {
                if *signal.borrow() {
                    info!("Step {} cancelled before start", step.id);
                    return ExecutionResult::Failed {
                        failure: StepFailure::Cancelled,
                        output: None,
                    };
                }
                tokio::select! {
                    result = run => result,
                    _ = cancelled(&mut signal) => {
                        warn!("Step {} cancelled, terminating `{}`", step.id, invocation.program);
                        return ExecutionResult::Failed {
                            failure: StepFailure::Cancelled,
                            output: None,
                        };
                    }
                }
            }
            None => run.await,
        };

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!("Step {} could not run: {}", step.id, e);
                return ExecutionResult::Failed {
                    failure: StepFailure::Spawn(e.to_string()),
                    output: None,
                };
            }
            Err(_) => {
                error!("Timeout for step {} after {}s", step.id, step.timeout_secs);
                return ExecutionResult::Failed {
                    failure: StepFailure::TimedOut(step.timeout_secs),
                    output: None,
                };
            }
        };

        debug!("Output of step {}: {}", step.id, output.combined());

        if output.success {
            info!("Step {} completed successfully", step.id);
            ExecutionResult::Success { output }
        } else {
            warn!("Step {} exited with {:?}", step.id, output.exit_code);
            ExecutionResult::Failed {
                failure: StepFailure::NonZeroExit {
                    code: output.exit_code,
                    message: output.combined(),
                },
                output: Some(output),
            }
        }
    }
}
