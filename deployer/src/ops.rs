//! Day-two operator commands from the production runbook.

use crate::config::DeployConfig;
use crate::envfile::{empty_keys, missing_keys, read_keys};
use crate::error::DeployResult;
use crate::steps::manage_py;
use compose::CommandRunner;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Show the state of the project's containers.
pub async fn status(config: &DeployConfig, runner: &dyn CommandRunner) -> DeployResult<()> {
    runner.run_checked(&config.compose_project().ps()).await?;
    Ok(())
}

/// Show container logs.
pub async fn logs(
    config: &DeployConfig,
    runner: &dyn CommandRunner,
    service: Option<&str>,
    follow: bool,
    tail: Option<u32>,
) -> DeployResult<()> {
    let invocation = config.compose_project().logs(service, follow, tail);
    runner.run_checked(&invocation).await?;
    Ok(())
}

/// Create a Django admin account interactively.
pub async fn create_superuser(
    config: &DeployConfig,
    runner: &dyn CommandRunner,
) -> DeployResult<()> {
    let invocation = config
        .compose_project()
        .exec_interactive(&config.web_service, manage_py(&["createsuperuser"]));
    runner.run_checked(&invocation).await?;
    Ok(())
}

/// Open a Django shell in the web container.
pub async fn django_shell(config: &DeployConfig, runner: &dyn CommandRunner) -> DeployResult<()> {
    let invocation = config
        .compose_project()
        .exec_interactive(&config.web_service, manage_py(&["shell"]));
    runner.run_checked(&invocation).await?;
    Ok(())
}

/// Result of the preflight check
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub env_file: PathBuf,
    pub env_file_present: bool,
    /// Parse error, if the environment file exists but is malformed
    pub env_file_error: Option<String>,
    pub compose_file: PathBuf,
    pub compose_file_present: bool,
    pub compose_available: bool,
    pub git_available: bool,
    pub git_checkout: bool,
    pub missing_keys: Vec<String>,
    pub empty_keys: Vec<String>,
}

impl CheckReport {
    /// Problems that would make `deploy` fail outright.
    pub fn blocking_problems(&self) -> usize {
        let mut problems = 0;
        if !self.env_file_present {
            problems += 1;
        }
        if !self.compose_file_present {
            problems += 1;
        }
        if !self.compose_available {
            problems += 1;
        }
        if self.git_checkout && !self.git_available {
            problems += 1;
        }
        problems
    }

    /// Problems worth fixing that do not stop a deployment.
    pub fn warnings(&self) -> usize {
        usize::from(self.env_file_error.is_some()) + self.missing_keys.len() + self.empty_keys.len()
    }

    pub fn print(&self) {
        println!("Preflight check\n");

        if self.env_file_present {
            println!("✓ Environment file: {}", self.env_file.display());
        } else {
            println!("✗ Environment file missing: {}", self.env_file.display());
            println!("  Create it from the runbook template before deploying");
        }
        if let Some(reason) = &self.env_file_error {
            println!("⚠ Environment file could not be parsed: {}", reason);
        }
        for key in &self.missing_keys {
            println!("⚠ {} is not set in the environment file", key);
        }
        for key in &self.empty_keys {
            println!("⚠ {} is empty", key);
        }

        if self.compose_file_present {
            println!("✓ Compose file: {}", self.compose_file.display());
        } else {
            println!("✗ Compose file missing: {}", self.compose_file.display());
        }

        if self.compose_available {
            println!("✓ docker-compose is installed");
        } else {
            println!("✗ docker-compose could not be run");
        }

        match (self.git_checkout, self.git_available) {
            (false, _) => println!("- Not a git checkout, source update will be skipped"),
            (true, true) => println!("✓ git checkout, source will be updated on deploy"),
            (true, false) => println!("✗ git checkout found but git could not be run"),
        }

        let blocking = self.blocking_problems();
        let warnings = self.warnings();
        if blocking == 0 && warnings == 0 {
            println!("\nReady to deploy");
        } else {
            println!("\n{} blocking problem(s), {} warning(s)", blocking, warnings);
        }
    }
}

/// Inspect the project directory and tools without changing anything.
pub async fn check(config: &DeployConfig, runner: &dyn CommandRunner) -> CheckReport {
    let project = config.compose_project();
    let checkout = config.checkout();
    let env_file = config.env_file_path();
    let compose_file = project.file_path();

    let env_file_present = env_file.exists();
    let (env_file_error, missing, empty) = if env_file_present {
        match read_keys(&env_file) {
            Ok(vars) => (None, missing_keys(&vars), empty_keys(&vars)),
            Err(e) => {
                warn!(error = %e, "environment file unreadable");
                (Some(e.to_string()), Vec::new(), Vec::new())
            }
        }
    } else {
        (None, Vec::new(), Vec::new())
    };

    let git_checkout = checkout.is_present();
    let git_available = if git_checkout {
        runner.probe(&checkout.version()).await
    } else {
        false
    };

    let report = CheckReport {
        env_file,
        env_file_present,
        env_file_error,
        compose_file_present: compose_file.is_file(),
        compose_file,
        compose_available: runner.probe(&project.version()).await,
        git_available,
        git_checkout,
        missing_keys: missing,
        empty_keys: empty,
    };

    info!(
        blocking = report.blocking_problems(),
        warnings = report.warnings(),
        "preflight check finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use compose::{ExitOutcome, Invocation, RunResult};
    use std::sync::Mutex;

    /// Succeeds for every program except those listed in `broken`.
    #[derive(Default)]
    struct ScriptedRunner {
        broken: Vec<String>,
        calls: Mutex<Vec<Invocation>>,
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, invocation: &Invocation) -> RunResult<ExitOutcome> {
            self.calls.lock().unwrap().push(invocation.clone());
            if self.broken.contains(&invocation.program) {
                Ok(ExitOutcome::failure(1))
            } else {
                Ok(ExitOutcome::success())
            }
        }
    }

    #[tokio::test]
    async fn test_operator_commands_use_compose() {
        let runner = ScriptedRunner::default();
        let config = DeployConfig::new();

        status(&config, &runner).await.unwrap();
        logs(&config, &runner, Some("web"), false, Some(50)).await.unwrap();
        create_superuser(&config, &runner).await.unwrap();
        django_shell(&config, &runner).await.unwrap();

        let calls = runner.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 4);
        assert!(calls[0].has_args(&["ps"]));
        assert!(calls[1].has_args(&["logs", "--tail=50", "web"]));
        assert!(calls[2].has_args(&["exec", "web", "python", "manage.py", "createsuperuser"]));
        assert!(calls[2].interactive);
        assert!(calls[3].has_args(&["manage.py", "shell"]));
    }

    #[tokio::test]
    async fn test_operator_command_failure_propagates() {
        let runner = ScriptedRunner {
            broken: vec!["docker-compose".to_string()],
            ..Default::default()
        };
        let error = status(&DeployConfig::new(), &runner).await.unwrap_err();
        assert_eq!(error.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_check_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::default();
        let config = DeployConfig::new().with_project_dir(dir.path());

        let report = check(&config, &runner).await;
        assert!(!report.env_file_present);
        assert!(!report.compose_file_present);
        assert!(report.compose_available);
        assert!(!report.git_checkout);
        assert_eq!(report.blocking_problems(), 2);
        assert!(report.missing_keys.is_empty());
    }

    #[tokio::test]
    async fn test_check_ready_project() {
        let dir = tempfile::tempdir().unwrap();
        let env: String = crate::envfile::APPLICATION_KEYS
            .iter()
            .map(|k| format!("{}=value\n", k))
            .collect();
        std::fs::write(dir.path().join(".env"), env).unwrap();
        std::fs::write(dir.path().join("docker-compose.production.yml"), "services: {}\n").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();

        let runner = ScriptedRunner::default();
        let report = check(&DeployConfig::new().with_project_dir(dir.path()), &runner).await;

        assert_eq!(report.blocking_problems(), 0);
        assert_eq!(report.warnings(), 0);
        assert!(report.git_checkout && report.git_available);
    }

    #[tokio::test]
    async fn test_check_reports_missing_keys_and_tools() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "SECRET_KEY=\nDEBUG=False\n").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();

        let runner = ScriptedRunner {
            broken: vec!["git".to_string(), "docker-compose".to_string()],
            ..Default::default()
        };
        let report = check(&DeployConfig::new().with_project_dir(dir.path()), &runner).await;

        assert!(report.env_file_present);
        assert_eq!(report.empty_keys, vec!["SECRET_KEY".to_string()]);
        assert!(report.missing_keys.contains(&"POSTGRES_DB".to_string()));
        assert!(!report.compose_available);
        assert!(!report.git_available);
        // compose file, compose binary, git binary
        assert_eq!(report.blocking_problems(), 3);
    }

    #[tokio::test]
    async fn test_missing_git_only_blocks_inside_a_checkout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "SECRET_KEY=x\n").unwrap();
        std::fs::write(dir.path().join("docker-compose.production.yml"), "services: {}\n").unwrap();
        let runner = ScriptedRunner {
            broken: vec!["git".to_string()],
            ..Default::default()
        };
        let config = DeployConfig::new().with_project_dir(dir.path());

        let report = check(&config, &runner).await;
        assert!(!report.git_checkout);
        assert_eq!(report.blocking_problems(), 0);

        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let report = check(&config, &runner).await;
        assert!(report.git_checkout && !report.git_available);
        assert_eq!(report.blocking_problems(), 1);
    }
}
