//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::runner::CommandOutput;

/// Overall pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Pipeline has not started
    Pending,
    /// Pipeline is currently running
    Running,
    /// Every step succeeded
    Completed,
    /// A step failed and the remaining steps were skipped
    Failed,
    /// The run was cancelled while a step was in flight
    Cancelled,
}

/// Why a step did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum StepFailure {
    /// `message` is the process's combined stdout and stderr
    #[error("exited with {}: {message}", exit_code_label(.code))]
    NonZeroExit { code: Option<i32>, message: String },

    #[error("failed to start: {0}")]
    Spawn(String),

    #[error("timed out after {0} seconds")]
    TimedOut(u64),

    #[error("cancelled")]
    Cancelled,
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "signal".to_string(),
    }
}

/// State of a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepState {
    /// Step has not been reached yet
    Pending,
    /// Step process is running
    Running {
        started_at: DateTime<Utc>,
    },
    /// Step process exited successfully
    Completed {
        output: CommandOutput,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Step did not succeed
    Failed {
        failure: StepFailure,
        output: Option<CommandOutput>,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
    /// Step never ran because an earlier step failed
    Skipped {
        reason: String,
    },
}

impl StepState {
    /// Check if step is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepState::Completed { .. } | StepState::Failed { .. } | StepState::Skipped { .. }
        )
    }
}

/// Final result of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Every step succeeded
    Succeeded,
    /// The named step failed; later steps never ran
    Aborted {
        step_id: String,
        failure: StepFailure,
    },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Succeeded)
    }

    /// The step that aborted the run, if any
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            PipelineOutcome::Succeeded => None,
            PipelineOutcome::Aborted { step_id, .. } => Some(step_id),
        }
    }
}

impl std::fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineOutcome::Succeeded => write!(f, "succeeded"),
            PipelineOutcome::Aborted { step_id, failure } => {
                write!(f, "aborted at {}: {}", step_id, failure)
            }
        }
    }
}

/// Overall pipeline state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Current execution status
    pub status: ExecutionStatus,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution finished
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of steps
    pub total_steps: usize,

    /// Number of steps that succeeded
    pub completed_steps: usize,

    /// Outcome, set once the run reaches a terminal state
    pub outcome: Option<PipelineOutcome>,
}

impl PipelineState {
    /// Create a new pipeline state
    pub fn new() -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            status: ExecutionStatus::Pending,
            started_at: None,
            completed_at: None,
            total_steps: 0,
            completed_steps: 0,
            outcome: None,
        }
    }

    /// Mark pipeline as started; every run gets its own execution ID
    pub fn start(&mut self, total_steps: usize) {
        self.execution_id = Uuid::new_v4();
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
        self.completed_at = None;
        self.total_steps = total_steps;
        self.completed_steps = 0;
        self.outcome = None;
    }

    /// Record the terminal outcome and derive the status from it
    pub fn finish(&mut self, outcome: PipelineOutcome) {
        self.status = match &outcome {
            PipelineOutcome::Succeeded => ExecutionStatus::Completed,
            PipelineOutcome::Aborted {
                failure: StepFailure::Cancelled,
                ..
            } => ExecutionStatus::Cancelled,
            PipelineOutcome::Aborted { .. } => ExecutionStatus::Failed,
        };
        self.completed_at = Some(Utc::now());
        self.outcome = Some(outcome);
    }

    /// Calculate progress (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        self.completed_steps as f64 / self.total_steps as f64
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
