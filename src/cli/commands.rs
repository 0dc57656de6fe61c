//! CLI command definitions

use crate::core::{
    config::{ConfigError, PipelineConfig},
    Pipeline,
};
use clap::Args;
use std::path::PathBuf;

/// Options shared by every command that builds a pipeline
#[derive(Debug, Args, Clone, Default)]
pub struct PipelineArgs {
    /// Pipeline YAML file (defaults to the built-in stage/commit/push pipeline)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Working directory the steps run in (overrides the pipeline file)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Variable overrides (key=value), e.g. --var branch=main
    #[arg(long = "var", value_parser = parse_key_value)]
    pub variables: Vec<(String, String)>,
}

impl PipelineArgs {
    /// Load the configuration these arguments point at
    pub fn load_config(&self) -> Result<PipelineConfig, ConfigError> {
        match &self.file {
            Some(path) => PipelineConfig::from_file(path),
            None => PipelineConfig::builtin(),
        }
    }

    /// Build the runtime pipeline with directory and variable overrides applied
    pub fn build_pipeline(&self) -> Result<Pipeline, ConfigError> {
        let mut pipeline = self.load_config()?.to_pipeline();
        if let Some(dir) = &self.dir {
            pipeline.working_dir = dir.clone();
        }
        for (key, value) in &self.variables {
            pipeline.variables.insert(key.clone(), value.clone());
        }
        Ok(pipeline)
    }
}

/// Run a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Timeout in seconds applied to every step
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Show the steps a run would execute without running them
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Validate a pipeline configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid key=value pair: {}", s)),
    }
}
