//! Test: Success Chain - every step succeeds and runs exactly once, in order

use crate::helpers::*;
use autopush::core::{ExecutionStatus, PipelineOutcome};

#[tokio::test]
async fn test_stage_commit_push_all_succeed() {
    let mut pipeline = builtin_pipeline();

    let result = run_pipeline_with_script(
        &mut pipeline,
        vec![
            Scripted::Succeed(""),
            Scripted::Succeed("[master 1a2b3c4] Automated commit by the application"),
            Scripted::Succeed("To origin\n   0f0f0f0..1a2b3c4  master -> master"),
        ],
    )
    .await;

    assert_eq!(result.outcome, PipelineOutcome::Succeeded);
    assert_eq!(
        result.commands(),
        vec![
            "git add --all",
            "git commit -m \"Automated commit by the application\"",
            "git push origin master",
        ]
    );

    for step_id in ["stage", "commit", "push"] {
        assert_step_completed(&result, step_id);
    }
    assert_eq!(result.pipeline.state.status, ExecutionStatus::Completed);
    assert_eq!(result.pipeline.state.completed_steps, 3);
    assert_eq!(result.pipeline.state.progress(), 1.0);
}

#[tokio::test]
async fn test_variable_overrides_reach_arguments() {
    let mut pipeline = builtin_pipeline();
    pipeline
        .variables
        .insert("message".to_string(), "Nightly snapshot".to_string());
    pipeline
        .variables
        .insert("branch".to_string(), "main".to_string());

    let result = run_pipeline_with_script(
        &mut pipeline,
        vec![
            Scripted::Succeed(""),
            Scripted::Succeed(""),
            Scripted::Succeed(""),
        ],
    )
    .await;

    assert!(result.outcome.is_success());
    assert_eq!(result.invocations[1].args, vec!["commit", "-m", "Nightly snapshot"]);
    assert_eq!(result.invocations[2].args, vec!["push", "origin", "main"]);
}

#[tokio::test]
async fn test_steps_run_in_working_dir_with_env() {
    let yaml = r#"
name: "deploy"
working_dir: "/srv/site"
steps:
  - id: "build"
    name: "Build"
    command: "make"
    args: ["site"]
    env:
      PROFILE: "release"
  - id: "publish"
    name: "Publish"
    command: "rsync"
    args: ["-a", "public/", "host:/var/www"]
"#;
    let mut pipeline = pipeline_from_yaml(yaml);

    let result = run_pipeline_with_script(
        &mut pipeline,
        vec![Scripted::Succeed(""), Scripted::Succeed("")],
    )
    .await;

    assert!(result.outcome.is_success());
    assert!(result
        .invocations
        .iter()
        .all(|i| i.working_dir == std::path::Path::new("/srv/site")));
    assert_eq!(
        result.invocations[0].env.get("PROFILE").map(String::as_str),
        Some("release")
    );
    assert!(result.invocations[1].env.is_empty());
}

#[tokio::test]
async fn test_every_step_invoked_exactly_once_for_longer_pipelines() {
    for n in 1..=6 {
        let mut pipeline = linear_pipeline(n);
        let script = vec![Scripted::Succeed("ok"); n];

        let result = run_pipeline_with_script(&mut pipeline, script).await;

        assert!(result.outcome.is_success(), "n = {}", n);
        let order: Vec<String> = result
            .invocations
            .iter()
            .map(|i| i.args[0].clone())
            .collect();
        let expected: Vec<String> = (0..n).map(|i| i.to_string()).collect();
        assert_eq!(order, expected, "n = {}", n);
    }
}

#[tokio::test]
async fn test_rerun_resets_step_states() {
    let mut pipeline = builtin_pipeline();

    let first = run_pipeline_with_script(
        &mut pipeline,
        vec![
            Scripted::Succeed(""),
            Scripted::FailStdout(1, "nothing to commit, working tree clean"),
        ],
    )
    .await;
    assert_aborted_at(&first, "commit");
    let first_id = first.pipeline.state.execution_id;

    let second = run_pipeline_with_script(
        &mut pipeline,
        vec![
            Scripted::Succeed(""),
            Scripted::Succeed(""),
            Scripted::Succeed(""),
        ],
    )
    .await;
    assert!(second.outcome.is_success());
    assert_step_completed(&second, "push");
    assert_eq!(second.invocations.len(), 3);
    assert_ne!(second.pipeline.state.execution_id, first_id);
}
