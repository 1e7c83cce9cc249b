//! Process runners.
//!
//! Every external tool call goes through [`CommandRunner`], so the deployment
//! sequence can be driven against real processes, printed as a dry run, or
//! recorded by a mock in tests.

use crate::invocation::Invocation;
use async_trait::async_trait;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Exit code used when a tool cannot be started at all, as a shell does for
/// "command not found".
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Errors raised while running external commands
#[derive(Error, Debug)]
pub enum RunError {
    /// The program could not be started (missing binary, bad cwd, permissions)
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully
    #[error("Command `{command}` failed with {}", describe_code(.code))]
    Failed { command: String, code: Option<i32> },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "no exit status (terminated by signal)".to_string(),
    }
}

impl RunError {
    /// Process exit code a caller should terminate with after this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Spawn { .. } => SPAWN_FAILURE_EXIT_CODE,
            RunError::Failed { code, .. } => match code {
                Some(code) if *code != 0 => *code,
                _ => 1,
            },
        }
    }
}

pub type RunResult<T> = Result<T, RunError>;

/// How a finished command exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    code: Option<i32>,
}

impl ExitOutcome {
    pub fn from_code(code: Option<i32>) -> Self {
        Self { code }
    }

    pub fn success() -> Self {
        Self { code: Some(0) }
    }

    pub fn failure(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitOutcome {
    fn from(status: std::process::ExitStatus) -> Self {
        Self::from_code(status.code())
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion and report how it exited.
    async fn run(&self, invocation: &Invocation) -> RunResult<ExitOutcome>;

    /// Run the command with its output suppressed and report whether it
    /// succeeded. A command that cannot be started counts as "not ready".
    async fn probe(&self, invocation: &Invocation) -> bool {
        matches!(self.run(invocation).await, Ok(outcome) if outcome.is_success())
    }

    /// Run the command and turn a non-zero exit into [`RunError::Failed`].
    async fn run_checked(&self, invocation: &Invocation) -> RunResult<()> {
        let outcome = self.run(invocation).await?;
        if outcome.is_success() {
            Ok(())
        } else {
            Err(RunError::Failed {
                command: invocation.to_string(),
                code: outcome.code(),
            })
        }
    }
}

/// Where a runner sends tool output and dry-run lines.
///
/// Machine-readable output on stdout needs everything else on stderr.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    #[default]
    Stdout,
    Stderr,
}

impl OutputStream {
    /// Print one line to this stream.
    pub fn line(&self, text: impl std::fmt::Display) {
        match self {
            OutputStream::Stdout => println!("{}", text),
            OutputStream::Stderr => eprintln!("{}", text),
        }
    }

    fn stdio(&self) -> Stdio {
        match self {
            OutputStream::Stdout => Stdio::inherit(),
            OutputStream::Stderr => Stdio::from(std::io::stderr()),
        }
    }
}

/// Spawns real processes. Tool output goes straight to the terminal so the
/// operator sees it as it happens. Only interactive invocations get the
/// terminal's stdin; everything else reads from `/dev/null` and cannot stall
/// on a prompt.
#[derive(Debug, Default, Clone)]
pub struct SystemRunner {
    output: OutputStream,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send the child's stdout to `output` instead of our stdout.
    pub fn with_output(mut self, output: OutputStream) -> Self {
        self.output = output;
        self
    }

    fn command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> RunResult<ExitOutcome> {
        debug!(command = %invocation, interactive = invocation.interactive, "spawning");
        let stdin = if invocation.interactive {
            Stdio::inherit()
        } else {
            Stdio::null()
        };
        let status = Self::command(invocation)
            .stdin(stdin)
            .stdout(self.output.stdio())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| RunError::Spawn {
                command: invocation.to_string(),
                source,
            })?;

        debug!(command = %invocation, code = ?status.code(), "exited");
        Ok(status.into())
    }

    async fn probe(&self, invocation: &Invocation) -> bool {
        debug!(command = %invocation, "probing");
        Self::command(invocation)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .is_ok_and(|status| status.success())
    }
}

/// Prints each command instead of running it. Every command "succeeds".
#[derive(Debug, Default, Clone)]
pub struct DryRunRunner {
    output: OutputStream,
}

impl DryRunRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, output: OutputStream) -> Self {
        self.output = output;
        self
    }

    /// The line printed for `invocation`.
    pub fn describe(invocation: &Invocation) -> String {
        let mut line = String::from("[dry-run]");
        if let Some(dir) = &invocation.cwd {
            line.push_str(&format!(" (in {})", dir.display()));
        }
        if invocation.interactive {
            line.push_str(" (interactive)");
        }
        format!("{} {}", line, invocation)
    }
}

#[async_trait]
impl CommandRunner for DryRunRunner {
    async fn run(&self, invocation: &Invocation) -> RunResult<ExitOutcome> {
        self.output.line(Self::describe(invocation));
        Ok(ExitOutcome::success())
    }
}
