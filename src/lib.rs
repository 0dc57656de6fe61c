//! autopush - stage, commit and push through a short-circuiting command pipeline

pub mod cli;
pub mod core;
pub mod execution;
pub mod runner;

// Re-export commonly used types
pub use core::{ExecutionStatus, Pipeline, PipelineContext, PipelineOutcome, Step, StepFailure, StepState};
pub use execution::{EngineError, ExecutionEngine, ExecutionEvent};
pub use runner::{CommandInvocation, CommandOutput, CommandRunner, RunnerError, SubprocessRunner};
