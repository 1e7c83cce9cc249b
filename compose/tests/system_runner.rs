//! Runs the compose invocations against a stand-in `docker-compose` script
//! that logs its arguments.

#![cfg(unix)]

use compose::{CommandRunner, ComposeProject, GitCheckout, RunError, SystemRunner};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

fn fake_tool(dir: &Path, name: &str, exit_code: i32) -> PathBuf {
    let path = dir.join(name);
    let script = format!(
        "#!/bin/sh\necho \"$(basename \"$(pwd -P)\") $*\" >> \"{}\"\nexit {}\n",
        dir.join("calls.log").display(),
        exit_code
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn logged_calls(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_compose_lifecycle_against_fake_binary() {
    let tools = tempfile::tempdir().unwrap();
    let project_dir = tempfile::tempdir().unwrap();
    let binary = fake_tool(tools.path(), "docker-compose", 0);
    let dir_name = project_dir
        .path()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .to_string();

    let project = ComposeProject::default()
        .with_binary(binary.to_string_lossy())
        .with_project_dir(project_dir.path());
    let runner = SystemRunner::new();

    for invocation in [project.build(), project.down(), project.up_detached()] {
        runner.run_checked(&invocation).await.unwrap();
    }

    assert_eq!(
        logged_calls(tools.path()),
        vec![
            format!("{} -f docker-compose.production.yml build", dir_name),
            format!("{} -f docker-compose.production.yml down", dir_name),
            format!("{} -f docker-compose.production.yml up -d", dir_name),
        ]
    );
}

#[tokio::test]
async fn test_failing_binary_reports_exit_code() {
    let tools = tempfile::tempdir().unwrap();
    let binary = fake_tool(tools.path(), "docker-compose", 5);
    let project = ComposeProject::default()
        .with_binary(binary.to_string_lossy())
        .with_project_dir(tools.path());

    match SystemRunner::new().run_checked(&project.build()).await {
        Err(error @ RunError::Failed { .. }) => assert_eq!(error.exit_code(), 5),
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_probe_is_quiet_and_boolean() {
    let tools = tempfile::tempdir().unwrap();
    let ready = fake_tool(tools.path(), "ready", 0);
    let not_ready = fake_tool(tools.path(), "not-ready", 1);
    let runner = SystemRunner::new();

    let project = ComposeProject::default().with_project_dir(tools.path());
    assert!(
        runner
            .probe(&project.clone().with_binary(ready.to_string_lossy()).version())
            .await
    );
    assert!(
        !runner
            .probe(&project.with_binary(not_ready.to_string_lossy()).version())
            .await
    );
}

#[tokio::test]
async fn test_git_pull_runs_in_checkout_dir() {
    let tools = tempfile::tempdir().unwrap();
    let checkout_dir = tempfile::tempdir().unwrap();
    let git = fake_tool(tools.path(), "git", 0);

    let checkout = GitCheckout::new(checkout_dir.path()).with_binary(git.to_string_lossy());
    SystemRunner::new()
        .run_checked(&checkout.pull())
        .await
        .unwrap();

    let dir_name = checkout_dir.path().file_name().unwrap().to_string_lossy();
    assert_eq!(logged_calls(tools.path()), vec![format!("{} pull", dir_name)]);
}
