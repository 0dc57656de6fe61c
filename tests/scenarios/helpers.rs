//! Test utility functions for autopush scenarios

use autopush::core::{config::PipelineConfig, Pipeline, PipelineOutcome, StepState};
use autopush::execution::ExecutionEngine;
use autopush::runner::{CommandInvocation, CommandOutput, CommandRunner, RunnerError};

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// What the scripted runner does for one invocation
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Exit 0 with the given stdout
    Succeed(&'static str),
    /// Exit with the given code and stderr
    Fail(i32, &'static str),
    /// Exit with the given code, reporting only on stdout (as `git commit` does)
    FailStdout(i32, &'static str),
    /// The program cannot be started
    SpawnError,
    /// Never finishes on its own
    Hang,
}

/// Mock runner that answers invocations in order and records them
pub struct ScriptedRunner {
    script: Arc<Vec<Scripted>>,
    index: Arc<AtomicUsize>,
    invocations: Arc<Mutex<Vec<CommandInvocation>>>,
}

impl ScriptedRunner {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Arc::new(script),
            index: Arc::new(AtomicUsize::new(0)),
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn invocations(&self) -> Arc<Mutex<Vec<CommandInvocation>>> {
        self.invocations.clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput, RunnerError> {
        self.invocations.lock().unwrap().push(invocation.clone());
        let idx = self.index.fetch_add(1, Ordering::SeqCst);

        match self.script.get(idx) {
            Some(Scripted::Succeed(stdout)) => Ok(CommandOutput::success(*stdout)),
            Some(Scripted::Fail(code, stderr)) => Ok(CommandOutput::failure(*code, *stderr)),
            Some(Scripted::FailStdout(code, stdout)) => Ok(CommandOutput {
                exit_code: Some(*code),
                success: false,
                stdout: stdout.to_string(),
                stderr: String::new(),
            }),
            Some(Scripted::Hang) => {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                Ok(CommandOutput::success(""))
            }
            Some(Scripted::SpawnError) | None => Err(RunnerError::Spawn {
                program: invocation.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted spawn failure"),
            }),
        }
    }
}

/// Test result from running a pipeline
#[derive(Debug, Clone)]
pub struct PipelineTestResult {
    pub pipeline: Pipeline,
    pub outcome: PipelineOutcome,
    pub invocations: Vec<CommandInvocation>,
}

impl PipelineTestResult {
    /// Invocations rendered as shell-like command lines
    pub fn commands(&self) -> Vec<String> {
        self.invocations.iter().map(|i| i.display()).collect()
    }

    pub fn state_of(&self, step_id: &str) -> &StepState {
        &self
            .pipeline
            .step(step_id)
            .unwrap_or_else(|| panic!("Step '{}' not found in result", step_id))
            .state
    }
}

/// Run a pipeline against a scripted runner
pub async fn run_pipeline_with_script(
    pipeline: &mut Pipeline,
    script: Vec<Scripted>,
) -> PipelineTestResult {
    run_pipeline_with_cancel(pipeline, script, None).await
}

/// Run a pipeline against a scripted runner with an optional cancel signal
pub async fn run_pipeline_with_cancel(
    pipeline: &mut Pipeline,
    script: Vec<Scripted>,
    cancel: Option<watch::Receiver<bool>>,
) -> PipelineTestResult {
    let runner = ScriptedRunner::new(script);
    let invocations = runner.invocations();

    let mut engine = ExecutionEngine::new(runner).with_workdir_lock(false);
    if let Some(signal) = cancel {
        engine = engine.with_cancellation(signal);
    }

    let outcome = engine
        .execute(pipeline)
        .await
        .expect("engine should start");

    let invocations = invocations.lock().unwrap().clone();
    PipelineTestResult {
        pipeline: pipeline.clone(),
        outcome,
        invocations,
    }
}

/// The built-in stage, commit and push pipeline
pub fn builtin_pipeline() -> Pipeline {
    PipelineConfig::builtin()
        .expect("built-in pipeline should parse")
        .to_pipeline()
}

/// Parse a pipeline from YAML string
pub fn pipeline_from_yaml(yaml: &str) -> Pipeline {
    PipelineConfig::from_yaml(yaml)
        .unwrap_or_else(|e| panic!("Failed to parse pipeline YAML: {}", e))
        .to_pipeline()
}

/// A pipeline of `n` steps with ids s0..s{n-1}
pub fn linear_pipeline(n: usize) -> Pipeline {
    let mut yaml = String::from("name: \"linear\"\nsteps:\n");
    for i in 0..n {
        yaml.push_str(&format!(
            "  - id: \"s{i}\"\n    name: \"Step {i}\"\n    command: \"true\"\n    args: [\"{i}\"]\n"
        ));
    }
    pipeline_from_yaml(&yaml)
}

/// Assert a step completed
pub fn assert_step_completed(result: &PipelineTestResult, step_id: &str) {
    let state = result.state_of(step_id);
    assert!(
        matches!(state, StepState::Completed { .. }),
        "Step '{}' should be completed, but was in state: {:?}",
        step_id,
        state
    );
}

/// Assert a step failed and its failure message contains `expected`
pub fn assert_step_failed(result: &PipelineTestResult, step_id: &str, expected: &str) {
    match result.state_of(step_id) {
        StepState::Failed { failure, .. } => {
            let message = failure.to_string();
            assert!(
                message.contains(expected),
                "Step '{}' failure:\n{}\n\ndoes not contain:\n{}",
                step_id,
                message,
                expected
            );
        }
        other => panic!(
            "Step '{}' should have failed, but was in state: {:?}",
            step_id, other
        ),
    }
}

/// Assert a step was skipped
pub fn assert_step_skipped(result: &PipelineTestResult, step_id: &str) {
    let state = result.state_of(step_id);
    assert!(
        matches!(state, StepState::Skipped { .. }),
        "Step '{}' should be skipped, but was in state: {:?}",
        step_id,
        state
    );
}

/// Assert the run aborted at `step_id`
pub fn assert_aborted_at(result: &PipelineTestResult, step_id: &str) {
    assert_eq!(
        result.outcome.failed_step(),
        Some(step_id),
        "Expected run to abort at '{}', outcome was: {}",
        step_id,
        result.outcome
    );
}
