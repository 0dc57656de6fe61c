//! Main execution engine - runs the pipeline steps in order

use crate::{
    core::{Pipeline, PipelineOutcome, StepFailure, StepState},
    execution::{ExecutionResult, StepExecutor, WorkdirLock},
    runner::{CommandOutput, CommandRunner},
};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Errors that stop a run before any step is invoked
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("another run holds the working directory {0}")]
    WorkdirBusy(PathBuf),

    #[error("failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
        total_steps: usize,
    },
    StepStarted {
        step_id: String,
        name: String,
        command: String,
        position: usize,
        total_steps: usize,
    },
    StepCompleted {
        step_id: String,
        output: CommandOutput,
    },
    StepFailed {
        step_id: String,
        failure: StepFailure,
        output: Option<CommandOutput>,
    },
    StepSkipped {
        step_id: String,
        reason: String,
    },
    PipelineCompleted {
        execution_id: Uuid,
        outcome: PipelineOutcome,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

/// Sequential, short-circuiting pipeline engine
pub struct ExecutionEngine<R> {
    executor: StepExecutor<R>,
    event_handlers: Vec<EventHandler>,
    cancel: Option<watch::Receiver<bool>>,
    lock_workdir: bool,
}

impl<R: CommandRunner> ExecutionEngine<R> {
    pub fn new(runner: R) -> Self {
        Self {
            executor: StepExecutor::new(runner),
            event_handlers: Vec::new(),
            cancel: None,
            lock_workdir: true,
        }
    }

    /// Kill the in-flight step and abort once `signal` flips to `true`
    pub fn with_cancellation(mut self, signal: watch::Receiver<bool>) -> Self {
        self.cancel = Some(signal);
        self
    }

    /// Whether to hold the working directory lock during a run
    pub fn with_workdir_lock(mut self, enabled: bool) -> Self {
        self.lock_workdir = enabled;
        self
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    /// Execute the entire pipeline
    ///
    /// Steps run strictly in order. The first failing step aborts the
    /// run and every later step is marked skipped without being invoked.
    /// Step failures are reported in the returned outcome; `Err` means
    /// the run could not start at all.
    pub async fn execute(&self, pipeline: &mut Pipeline) -> Result<PipelineOutcome, EngineError> {
        let _lock = if self.lock_workdir {
            Some(WorkdirLock::acquire(&pipeline.working_dir)?)
        } else {
            None
        };

        let total_steps = pipeline.steps.len();
        for step in &mut pipeline.steps {
            step.state = StepState::Pending;
        }
        pipeline.state.start(total_steps);
        let execution_id = pipeline.state.execution_id;

        info!(
            "Starting pipeline execution: {} ({}) in {}",
            pipeline.name,
            execution_id,
            pipeline.working_dir.display()
        );
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name: pipeline.name.clone(),
            total_steps,
        });

        let mut outcome = PipelineOutcome::Succeeded;

        for index in 0..total_steps {
            let step = pipeline.steps[index].clone();

            if let PipelineOutcome::Aborted { step_id: failed, .. } = &outcome {
                let reason = format!("step '{}' failed", failed);
                debug!("Skipping step {}: {}", step.id, reason);
                pipeline.steps[index].state = StepState::Skipped {
                    reason: reason.clone(),
                };
                self.emit_event(ExecutionEvent::StepSkipped {
                    step_id: step.id.clone(),
                    reason,
                });
                continue;
            }

            let context = pipeline.create_context_for_step(&step.id);
            let started_at = chrono::Utc::now();
            pipeline.steps[index].state = StepState::Running { started_at };

            if let Some(precondition) = &step.precondition {
                debug!("Step {} requires: {}", step.id, precondition);
            }
            self.emit_event(ExecutionEvent::StepStarted {
                step_id: step.id.clone(),
                name: step.name.clone(),
                command: step
                    .invocation(&context.working_dir, &context.variables)
                    .display(),
                position: index + 1,
                total_steps,
            });

            match self.executor.execute(&step, &context, self.cancel.clone()).await {
                ExecutionResult::Success { output } => {
                    if let Some(postcondition) = &step.postcondition {
                        debug!("Step {} established: {}", step.id, postcondition);
                    }
                    pipeline.steps[index].state = StepState::Completed {
                        output: output.clone(),
                        started_at,
                        completed_at: chrono::Utc::now(),
                    };
                    pipeline.state.completed_steps += 1;
                    self.emit_event(ExecutionEvent::StepCompleted {
                        step_id: step.id.clone(),
                        output,
                    });
                }
                ExecutionResult::Failed { failure, output } => {
                    error!("Step {} failed: {}", step.id, failure);
                    pipeline.steps[index].state = StepState::Failed {
                        failure: failure.clone(),
                        output: output.clone(),
                        started_at,
                        failed_at: chrono::Utc::now(),
                    };
                    self.emit_event(ExecutionEvent::StepFailed {
                        step_id: step.id.clone(),
                        failure: failure.clone(),
                        output,
                    });
                    outcome = PipelineOutcome::Aborted {
                        step_id: step.id.clone(),
                        failure,
                    };
                }
            }
        }

        pipeline.state.finish(outcome.clone());

        if outcome.is_success() {
            info!("Pipeline execution finished: {} - succeeded", pipeline.name);
        } else {
            error!("Pipeline execution finished: {} - {}", pipeline.name, outcome);
        }
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id,
            outcome: outcome.clone(),
        });

        Ok(outcome)
    }
}
