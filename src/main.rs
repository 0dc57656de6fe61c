use anyhow::{Context, Result};
use autopush::cli::commands::{PlanCommand, RunCommand, ValidateCommand};
use autopush::cli::output::*;
use autopush::cli::{Cli, Command};
use autopush::core::config::PipelineConfig;
use autopush::core::Pipeline;
use autopush::execution::{ExecutionEngine, ExecutionEvent};
use autopush::runner::SubprocessRunner;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Captured output lines shown for a failed or streamed step
const OUTPUT_LINES: usize = 20;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, cli.stream).await?,
        Command::Plan(cmd) => plan_pipeline(cmd)?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
    }

    Ok(())
}

async fn run_pipeline(cmd: &RunCommand, stream: bool) -> Result<()> {
    let mut pipeline = cmd
        .pipeline
        .build_pipeline()
        .context("Failed to load pipeline config")?;
    if let Some(timeout) = cmd.timeout {
        pipeline.set_timeout(timeout);
    }

    // Ctrl-C kills the in-flight step and aborts the run
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling the running step");
            let _ = cancel_tx.send(true);
        }
    });

    let mut engine = ExecutionEngine::new(SubprocessRunner::new()).with_cancellation(cancel_rx);

    let quiet = cmd.json;
    let spinner = Arc::new(StepSpinner::new(quiet));
    let handler_spinner = spinner.clone();
    let width = terminal_width();
    engine.add_event_handler(move |event| {
        if quiet {
            return;
        }
        match event {
            ExecutionEvent::StepStarted { .. } => {
                handler_spinner.start(format_execution_event(event));
            }
            ExecutionEvent::StepCompleted { output, .. } => {
                handler_spinner.clear();
                println!("{}", format_execution_event(event));
                let text = output.combined();
                if stream && !text.is_empty() {
                    println!("{}", format_output(&text, OUTPUT_LINES, width));
                }
            }
            ExecutionEvent::StepFailed { output, .. } => {
                handler_spinner.clear();
                println!("{}", format_execution_event(event));
                if let Some(text) = output.as_ref().map(|o| o.combined()) {
                    if !text.is_empty() {
                        println!("{}", format_output(&text, OUTPUT_LINES, width));
                    }
                }
            }
            _ => println!("{}", format_execution_event(event)),
        }
    });

    let outcome = engine
        .execute(&mut pipeline)
        .await
        .context("Failed to start pipeline")?;
    spinner.clear();

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&run_report(&pipeline))?);
    } else {
        println!("\n{}", format_outcome(&pipeline.name, &outcome));
        println!("  Status: {}", format_status(pipeline.state.status));
        for step in &pipeline.steps {
            println!("  {:<12} {}", step.id, format_step_state(&step.state));
        }
    }

    if !outcome.is_success() {
        error!("{}", outcome);
        std::process::exit(1);
    }

    Ok(())
}

fn run_report(pipeline: &Pipeline) -> serde_json::Value {
    let steps: Vec<_> = pipeline
        .steps
        .iter()
        .map(|step| {
            serde_json::json!({
                "id": step.id,
                "name": step.name,
                "state": step.state,
            })
        })
        .collect();

    serde_json::json!({
        "execution_id": pipeline.state.execution_id,
        "pipeline": pipeline.name,
        "working_dir": pipeline.working_dir,
        "status": pipeline.state.status,
        "outcome": pipeline.state.outcome,
        "started_at": pipeline.state.started_at,
        "completed_at": pipeline.state.completed_at,
        "steps": steps,
    })
}

fn plan_pipeline(cmd: &PlanCommand) -> Result<()> {
    let pipeline = cmd
        .pipeline
        .build_pipeline()
        .context("Failed to load pipeline config")?;

    if cmd.json {
        let steps: Vec<_> = pipeline
            .steps
            .iter()
            .map(|step| {
                let context = pipeline.create_context_for_step(&step.id);
                serde_json::json!({
                    "id": step.id,
                    "name": step.name,
                    "invocation": step.invocation(&context.working_dir, &context.variables),
                    "timeout_secs": step.timeout_secs,
                    "precondition": step.precondition,
                    "postcondition": step.postcondition,
                })
            })
            .collect();
        let data = serde_json::json!({
            "pipeline": pipeline.name,
            "working_dir": pipeline.working_dir,
            "steps": steps,
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!(
        "{} Pipeline {} in {}",
        INFO,
        style(&pipeline.name).bold(),
        style(pipeline.working_dir.display()).dim()
    );
    for (index, step) in pipeline.steps.iter().enumerate() {
        let context = pipeline.create_context_for_step(&step.id);
        let command = step
            .invocation(&context.working_dir, &context.variables)
            .display();
        println!("{}", format_plan_step(index + 1, step, &command));
    }
    println!(
        "  {}",
        style("Each step runs only if every earlier step succeeded.").dim()
    );

    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    match PipelineConfig::from_file(&cmd.file) {
        Ok(config) => {
            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{}", json);
                return Ok(());
            }
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Steps: {}", style(config.steps.len()).cyan());
            println!("  Variables: {}", style(config.variables.len()).cyan());
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}
