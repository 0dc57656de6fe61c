//! Test: Short Circuit - the first failing step aborts the run

use crate::helpers::*;
use autopush::core::{ExecutionStatus, PipelineOutcome, StepFailure};

#[tokio::test]
async fn test_commit_fails_push_never_invoked() {
    let mut pipeline = builtin_pipeline();

    let result = run_pipeline_with_script(
        &mut pipeline,
        vec![
            Scripted::Succeed(""),
            Scripted::FailStdout(1, "nothing to commit, working tree clean"),
            Scripted::Succeed("should never be used"),
        ],
    )
    .await;

    assert_aborted_at(&result, "commit");
    assert_eq!(result.invocations.len(), 2);
    assert!(result.commands().iter().all(|c| !c.contains("push")));

    assert_step_completed(&result, "stage");
    assert_step_failed(&result, "commit", "nothing to commit");
    assert_step_skipped(&result, "push");
    assert_eq!(result.pipeline.state.status, ExecutionStatus::Failed);
    assert_eq!(
        result.outcome.to_string(),
        "aborted at commit: exited with code 1: nothing to commit, working tree clean"
    );
}

#[tokio::test]
async fn test_stage_fails_nothing_else_invoked() {
    let mut pipeline = builtin_pipeline();

    let result = run_pipeline_with_script(
        &mut pipeline,
        vec![Scripted::Fail(128, "fatal: not a git repository")],
    )
    .await;

    assert_aborted_at(&result, "stage");
    assert_eq!(result.commands(), vec!["git add --all"]);
    assert_step_failed(&result, "stage", "not a git repository");
    assert_step_skipped(&result, "commit");
    assert_step_skipped(&result, "push");
}

#[tokio::test]
async fn test_push_failure_keeps_earlier_steps_completed() {
    let mut pipeline = builtin_pipeline();

    let result = run_pipeline_with_script(
        &mut pipeline,
        vec![
            Scripted::Succeed(""),
            Scripted::Succeed(""),
            Scripted::Fail(1, "error: failed to push some refs"),
        ],
    )
    .await;

    assert_aborted_at(&result, "push");
    assert_step_completed(&result, "stage");
    assert_step_completed(&result, "commit");
    assert_eq!(result.pipeline.state.completed_steps, 2);
}

#[tokio::test]
async fn test_spawn_failure_aborts() {
    let mut pipeline = builtin_pipeline();

    let result = run_pipeline_with_script(&mut pipeline, vec![Scripted::SpawnError]).await;

    match &result.outcome {
        PipelineOutcome::Aborted { step_id, failure } => {
            assert_eq!(step_id, "stage");
            assert!(matches!(failure, StepFailure::Spawn(_)));
        }
        other => panic!("Expected abort, got {:?}", other),
    }
    assert_eq!(result.invocations.len(), 1);
}

#[tokio::test]
async fn test_failure_at_every_position() {
    let n = 5;
    for k in 0..n {
        let mut pipeline = linear_pipeline(n);
        let mut script = vec![Scripted::Succeed(""); k];
        script.push(Scripted::Fail(2, "boom"));
        script.extend(vec![Scripted::Succeed(""); n - k - 1]);

        let result = run_pipeline_with_script(&mut pipeline, script).await;

        let failed = format!("s{}", k);
        assert_aborted_at(&result, &failed);
        assert_eq!(result.invocations.len(), k + 1, "failure at {}", k);
        for i in 0..k {
            assert_step_completed(&result, &format!("s{}", i));
        }
        for i in (k + 1)..n {
            assert_step_skipped(&result, &format!("s{}", i));
        }
    }
}
