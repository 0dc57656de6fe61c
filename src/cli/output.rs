//! CLI output formatting

use crate::{
    core::{ExecutionStatus, PipelineOutcome, Step, StepState},
    execution::ExecutionEvent,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Fallback width when stdout is not a terminal
const DEFAULT_WIDTH: usize = 100;

/// Spinner shown while a step process runs; one bar per step
#[derive(Default)]
pub struct StepSpinner {
    hidden: bool,
    current: Mutex<Option<ProgressBar>>,
}

impl StepSpinner {
    pub fn new(hidden: bool) -> Self {
        Self {
            hidden,
            current: Mutex::new(None),
        }
    }

    /// Replace any running spinner with a new one showing `message`
    pub fn start(&self, message: String) {
        if self.hidden {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
            spinner.set_style(template);
        }
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(100));

        if let Ok(mut current) = self.current.lock() {
            if let Some(previous) = current.replace(spinner) {
                previous.finish_and_clear();
            }
        }
    }

    /// Remove the running spinner, if any
    pub fn clear(&self) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(spinner) = current.take() {
                spinner.finish_and_clear();
            }
        }
    }
}

/// Format a step state for display
pub fn format_step_state(state: &StepState) -> String {
    match state {
        StepState::Pending => style("PENDING").dim().to_string(),
        StepState::Running { .. } => style("RUNNING").yellow().to_string(),
        StepState::Completed { .. } => style("COMPLETED").green().to_string(),
        StepState::Failed { .. } => style("FAILED").red().to_string(),
        StepState::Skipped { .. } => style("SKIPPED").dim().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
        ExecutionStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

/// Format the final outcome of a run
pub fn format_outcome(pipeline_name: &str, outcome: &PipelineOutcome) -> String {
    match outcome {
        PipelineOutcome::Succeeded => format!(
            "{} {} completed {}",
            CHECK,
            style(pipeline_name).bold(),
            style("successfully").green()
        ),
        PipelineOutcome::Aborted { step_id, failure } => format!(
            "{} {} {} at {}: {}",
            CROSS,
            style(pipeline_name).bold(),
            style("aborted").red(),
            style(step_id).red().bold(),
            failure
        ),
    }
}

/// Format one step of a plan
pub fn format_plan_step(position: usize, step: &Step, command: &str) -> String {
    let mut lines = vec![format!(
        "  {}. {} {} {}",
        position,
        style(&step.id).cyan().bold(),
        style(&step.name).dim(),
        style(format!("(timeout {}s)", step.timeout_secs)).dim()
    )];
    lines.push(format!("     $ {}", command));
    if let Some(precondition) = &step.precondition {
        lines.push(format!("     requires: {}", precondition));
    }
    if let Some(postcondition) = &step.postcondition {
        lines.push(format!("     ensures:  {}", postcondition));
    }
    lines.join("\n")
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
            total_steps,
        } => format!(
            "{} Starting pipeline {} ({}, {} steps)",
            ROCKET,
            style(pipeline_name).bold(),
            style(&execution_id.to_string()[..8]).dim(),
            total_steps
        ),
        ExecutionEvent::StepStarted {
            step_id,
            command,
            position,
            total_steps,
            ..
        } => format!(
            "{} [{}/{}] {} {}",
            SPINNER,
            position,
            total_steps,
            style(step_id).cyan(),
            style(command).dim()
        ),
        ExecutionEvent::StepCompleted { step_id, .. } => {
            format!("{} {}", CHECK, style(step_id).green())
        }
        ExecutionEvent::StepFailed { step_id, failure, .. } => {
            format!("{} {}: {}", CROSS, style(step_id).red(), style(failure).dim())
        }
        ExecutionEvent::StepSkipped { step_id, reason } => {
            format!("{} {} ({})", SKIP, style(step_id).dim(), reason)
        }
        ExecutionEvent::PipelineCompleted {
            execution_id,
            outcome,
        } => {
            let outcome_str = match outcome {
                PipelineOutcome::Succeeded => style("succeeded").green().to_string(),
                PipelineOutcome::Aborted { step_id, .. } => {
                    format!("{} at {}", style("aborted").red(), step_id)
                }
            };
            format!(
                "{} Pipeline ({}) {}",
                INFO,
                style(&execution_id.to_string()[..8]).dim(),
                outcome_str
            )
        }
    }
}

/// Terminal width for output, falling back when stdout is not a tty
pub fn terminal_width() -> usize {
    term_size::dimensions_stdout()
        .map(|(width, _)| width)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Format step output with truncation to `max_lines` lines of `width` columns
pub fn format_output(output: &str, max_lines: usize, width: usize) -> String {
    let width = width.max(8);
    let lines: Vec<String> = output
        .lines()
        .map(|line| {
            if line.chars().count() > width {
                let cut: String = line.chars().take(width - 1).collect();
                format!("{}…", cut)
            } else {
                line.to_string()
            }
        })
        .collect();

    if lines.len() <= max_lines {
        lines.join("\n")
    } else {
        format!(
            "{}\n{}... ({} more lines)",
            lines[..max_lines].join("\n"),
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}
