//! Pipeline context - what a step sees when it is rendered

use std::collections::HashMap;
use std::path::PathBuf;

/// Execution context for one step
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Pipeline variables after CLI overrides
    pub variables: HashMap<String, String>,

    /// Directory the step runs in
    pub working_dir: PathBuf,

    /// The current step being executed (if any)
    pub current_step_id: Option<String>,
}

impl PipelineContext {
    /// Create an empty context rooted at `working_dir`
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            variables: HashMap::new(),
            working_dir,
            current_step_id: None,
        }
    }

    /// Set a variable
    pub fn set_variable(&mut self, key: String, value: String) {
        self.variables.insert(key, value);
    }

    /// Get a variable
    pub fn get_variable(&self, key: &str) -> Option<&String> {
        self.variables.get(key)
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new(PathBuf::from("."))
    }
}
