//! Pipeline domain model

use crate::core::{
    config::{PipelineConfig, DEFAULT_TIMEOUT_SECS},
    context::PipelineContext,
    state::{ExecutionStatus, PipelineState, StepState},
    step::Step,
};
use std::collections::HashMap;
use std::path::PathBuf;

/// A pipeline definition plus its runtime state
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Directory every step runs in
    pub working_dir: PathBuf,

    /// Variables substituted into step arguments
    pub variables: HashMap<String, String>,

    /// Steps in execution order
    pub steps: Vec<Step>,

    /// Execution state
    pub state: PipelineState,
}

impl Pipeline {
    /// Create a pipeline from configuration
    pub fn from_config(config: &PipelineConfig) -> Self {
        let default_timeout = config.default_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);

        Pipeline {
            name: config.name.clone(),
            working_dir: config
                .working_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(".")),
            variables: config.variables_as_string_map(),
            steps: config
                .steps
                .iter()
                .map(|step_config| Step::from_config(step_config, default_timeout))
                .collect(),
            state: PipelineState::new(),
        }
    }

    /// Get a step by ID
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Get a mutable step by ID
    pub fn step_mut(&mut self, id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// Step IDs in execution order
    pub fn execution_order(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id.as_str()).collect()
    }

    /// Override every step's timeout
    pub fn set_timeout(&mut self, timeout_secs: u64) {
        for step in &mut self.steps {
            step.timeout_secs = timeout_secs;
        }
    }

    /// Check if every step reached a terminal state
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.state.is_terminal())
    }

    /// Check if pipeline has failed
    pub fn has_failed(&self) -> bool {
        matches!(
            self.state.status,
            ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }

    /// Put every step back to pending for a fresh run
    pub fn reset(&mut self) {
        for step in &mut self.steps {
            step.state = StepState::Pending;
        }
        self.state = PipelineState::new();
    }

    /// Create execution context for a step
    pub fn create_context_for_step(&self, step_id: &str) -> PipelineContext {
        let mut context = PipelineContext::new(self.working_dir.clone());
        context.variables.extend(self.variables.clone());
        context.current_step_id = Some(step_id.to_string());
        context
    }
}
