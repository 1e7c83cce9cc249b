//! The deployment sequence.
//!
//! ```text
//! .env check -> [git pull] -> build -> down -> up -d -> wait -> migrate -> collectstatic
//! ```
//!
//! Every step blocks until its command exits. The first failure ends the run;
//! nothing already done is undone.

use crate::config::DeployConfig;
use crate::envfile::require_env_file;
use crate::error::{DeployError, DeployResult};
use crate::readiness::{postgres_probe, wait_for_database};
use crate::steps::{manage_py, Step};
use chrono::{DateTime, Utc};
use compose::{CommandRunner, ComposeProject, GitCheckout, Invocation, OutputStream};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// What happened to one step of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: Step,
    /// Command line that was run; `None` for the wait step
    pub command: Option<String>,
    pub duration_ms: u64,
}

/// Summary of a successful deployment
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub steps: Vec<StepOutcome>,
    /// Steps left out of the plan (source update without a git checkout)
    pub skipped: Vec<Step>,
}

impl DeploymentReport {
    pub fn completed(&self) -> Vec<Step> {
        self.steps.iter().map(|outcome| outcome.step).collect()
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.steps.iter().map(|outcome| outcome.duration_ms).sum()
    }
}

/// One deployment of a compose project, bound to a command runner.
pub struct Deployment<'a> {
    config: DeployConfig,
    runner: &'a dyn CommandRunner,
    project: ComposeProject,
    checkout: GitCheckout,
    dry_run: bool,
    output: OutputStream,
}

impl<'a> Deployment<'a> {
    pub fn new(config: DeployConfig, runner: &'a dyn CommandRunner) -> Self {
        let project = config.compose_project();
        let checkout = config.checkout();
        Self {
            config,
            runner,
            project,
            checkout,
            dry_run: false,
            output: OutputStream::Stdout,
        }
    }

    /// Print the wait step instead of sleeping. Commands still go to the
    /// runner, which should be a [`compose::DryRunRunner`].
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Stream for progress lines. Use stderr when stdout carries a report.
    pub fn with_output(mut self, output: OutputStream) -> Self {
        self.output = output;
        self
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Steps this run will execute, in order.
    pub fn plan(&self) -> Vec<Step> {
        let has_checkout = self.checkout.is_present();
        Step::ALL
            .into_iter()
            .filter(|step| *step != Step::UpdateSource || has_checkout)
            .collect()
    }

    /// Command line for a step; `None` for steps that run no command.
    pub fn invocation(&self, step: Step) -> Option<Invocation> {
        let web = self.config.web_service.as_str();
        match step {
            Step::UpdateSource => Some(self.checkout.pull()),
            Step::Build => Some(self.project.build()),
            Step::StopOld => Some(self.project.down()),
            Step::StartNew => Some(self.project.up_detached()),
            Step::WaitForDatabase => None,
            Step::Migrate => Some(
                self.project
                    .exec(web, manage_py(&["migrate", "--noinput"])),
            ),
            Step::CollectStatic => Some(
                self.project
                    .exec(web, manage_py(&["collectstatic", "--noinput"])),
            ),
        }
    }

    /// Run the whole sequence.
    ///
    /// Fails with [`DeployError::MissingEnvFile`] before any command when the
    /// environment file is absent, and with the first failing step otherwise.
    pub async fn run(&self) -> DeployResult<DeploymentReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("deploy", %run_id, dry_run = self.dry_run);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> DeployResult<DeploymentReport> {
        let env_file = self.config.env_file_path();
        if let Err(e) = require_env_file(&env_file) {
            error!(path = %env_file.display(), "environment file missing");
            return Err(e);
        }

        let started_at = Utc::now();
        let plan = self.plan();
        let skipped: Vec<Step> = Step::ALL
            .into_iter()
            .filter(|step| !plan.contains(step))
            .collect();

        info!(
            project_dir = %self.config.project_dir.display(),
            compose_file = %self.config.compose_file.display(),
            steps = plan.len(),
            "starting deployment"
        );
        if skipped.contains(&Step::UpdateSource) {
            info!("no git checkout, skipping source update");
        }

        let mut steps = Vec::with_capacity(plan.len());
        for step in plan {
            self.output.line(format!("==> {}...", step.description()));
            let started = Instant::now();

            let command = self.execute(step).await.inspect_err(|e| {
                error!(%step, error = %e, "step failed");
            })?;

            let duration_ms = started.elapsed().as_millis() as u64;
            info!(%step, duration_ms, "step completed");
            steps.push(StepOutcome {
                step,
                command,
                duration_ms,
            });
        }

        let report = DeploymentReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            dry_run: self.dry_run,
            steps,
            skipped,
        };
        info!(duration_ms = report.total_duration_ms(), "deployment completed");
        Ok(report)
    }

    async fn execute(&self, step: Step) -> DeployResult<Option<String>> {
        match self.invocation(step) {
            Some(invocation) => {
                self.runner
                    .run_checked(&invocation)
                    .await
                    .map_err(|source| DeployError::Step { step, source })?;
                Ok(Some(invocation.to_string()))
            }
            None => {
                self.wait().await?;
                Ok(None)
            }
        }
    }

    async fn wait(&self) -> DeployResult<()> {
        let probe = postgres_probe(
            &self.project,
            &self.config.db_service,
            &self.config.readiness_command,
        );

        if self.dry_run {
            self.output.line(format!(
                "[dry-run] wait for '{}': {}",
                self.config.db_service, self.config.wait
            ));
            return Ok(());
        }

        wait_for_database(self.config.wait, &probe, &self.config.db_service, self.runner).await?;
        Ok(())
    }
}
