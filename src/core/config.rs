//! Pipeline configuration from YAML

use crate::core::Pipeline;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Default per-step timeout when neither the step nor the pipeline sets one
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// The built-in stage, commit and push pipeline
pub const BUILTIN_PIPELINE_YAML: &str = r#"
name: "git-autopush"

variables:
  message: "Automated commit by the application"
  remote: "origin"
  branch: "master"

steps:
  - id: "stage"
    name: "Stage all changes"
    command: "git"
    args: ["add", "--all"]
    precondition: "working directory is a git work tree"
    postcondition: "every pending change is staged in the index"

  - id: "commit"
    name: "Commit staged changes"
    command: "git"
    args: ["commit", "-m", "{{ message }}"]
    precondition: "the index holds staged changes"
    postcondition: "a new commit exists on the current branch"

  - id: "push"
    name: "Push to remote"
    command: "git"
    args: ["push", "{{ remote }}", "{{ branch }}"]
    precondition: "the current branch has a commit not yet on the remote"
    postcondition: "the remote branch points at the new commit"
"#;

/// Errors raised while loading or validating a pipeline definition
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pipeline YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("pipeline '{0}' has no steps")]
    NoSteps(String),

    #[error("duplicate step ID: {0}")]
    DuplicateStep(String),

    #[error("step '{0}' has an empty command")]
    EmptyCommand(String),

    #[error("step '{0}' has a zero timeout")]
    ZeroTimeout(String),

    #[error("pipeline '{0}' has a zero default timeout")]
    ZeroDefaultTimeout(String),

    #[error("step '{step}' references undefined variable '{variable}'")]
    UndefinedVariable { step: String, variable: String },
}

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Pipeline version (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Directory every step runs in (defaults to the current directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Variables substituted into step arguments
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Pipeline steps, executed in order
    pub steps: Vec<StepConfig>,

    /// Default timeout for steps (in seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout_secs: Option<u64>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Unique step identifier
    pub id: String,

    /// Human-readable step name
    pub name: String,

    /// Optional step description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Program to execute
    pub command: String,

    /// Argument templates, `{{ var }}` placeholders allowed
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables for the process
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// What must hold before the step runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precondition: Option<String>,

    /// What holds after the step succeeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcondition: Option<String>,

    /// Timeout for this step (overrides global)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex is valid")
    })
}

/// Names of every `{{ var }}` placeholder in a template
pub fn placeholders(template: &str) -> Vec<String> {
    placeholder_regex()
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .collect()
}

/// Substitute `{{ var }}` placeholders; unknown names are left untouched
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            variables
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// The built-in git stage, commit and push pipeline
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml(BUILTIN_PIPELINE_YAML)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::NoSteps(self.name.clone()));
        }

        if self.default_timeout_secs == Some(0) {
            return Err(ConfigError::ZeroDefaultTimeout(self.name.clone()));
        }

        let mut seen_ids = HashSet::new();
        for step in &self.steps {
            if !seen_ids.insert(&step.id) {
                return Err(ConfigError::DuplicateStep(step.id.clone()));
            }

            if step.command.trim().is_empty() {
                return Err(ConfigError::EmptyCommand(step.id.clone()));
            }

            if step.timeout_secs == Some(0) {
                return Err(ConfigError::ZeroTimeout(step.id.clone()));
            }

            let templates = step.args.iter().chain(step.env.values());
            for variable in templates.flat_map(|template| placeholders(template)) {
                if !self.variables.contains_key(&variable) {
                    return Err(ConfigError::UndefinedVariable {
                        step: step.id.clone(),
                        variable,
                    });
                }
            }
        }

        Ok(())
    }

    /// Variables as a plain map for rendering
    pub fn variables_as_string_map(&self) -> HashMap<String, String> {
        self.variables
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Build the runtime pipeline from this configuration
    pub fn to_pipeline(&self) -> Pipeline {
        Pipeline::from_config(self)
    }
}
