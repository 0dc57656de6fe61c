//! Step domain model

use crate::core::{
    config::{render_template, StepConfig},
    state::StepState,
};
use crate::runner::CommandInvocation;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// A single step in a pipeline
#[derive(Debug, Clone)]
pub struct Step {
    /// Unique step identifier
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Program to execute
    pub command: String,

    /// Argument templates
    pub args: Vec<String>,

    /// Extra environment variables
    pub env: BTreeMap<String, String>,

    /// What must hold before the step runs
    pub precondition: Option<String>,

    /// What holds once the step has succeeded
    pub postcondition: Option<String>,

    /// Timeout in seconds
    pub timeout_secs: u64,

    /// Runtime state
    pub state: StepState,
}

impl Step {
    /// Create a step from a step config
    pub fn from_config(config: &StepConfig, default_timeout_secs: u64) -> Self {
        Step {
            id: config.id.clone(),
            name: config.name.clone(),
            command: config.command.clone(),
            args: config.args.clone(),
            env: config.env.clone(),
            precondition: config.precondition.clone(),
            postcondition: config.postcondition.clone(),
            timeout_secs: config.timeout_secs.unwrap_or(default_timeout_secs),
            state: StepState::Pending,
        }
    }

    /// Arguments with `{{ var }}` placeholders substituted
    pub fn render_args(&self, variables: &HashMap<String, String>) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| render_template(arg, variables))
            .collect()
    }

    /// Build the invocation for this step inside `working_dir`
    pub fn invocation(
        &self,
        working_dir: &Path,
        variables: &HashMap<String, String>,
    ) -> CommandInvocation {
        let mut invocation = CommandInvocation::new(self.command.clone())
            .with_args(self.render_args(variables))
            .with_working_dir(working_dir);
        for (key, value) in &self.env {
            invocation = invocation.with_env(key.clone(), render_template(value, variables));
        }
        invocation
    }
}
