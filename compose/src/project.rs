use crate::invocation::Invocation;
use std::path::{Path, PathBuf};

/// Default orchestration file for production deployments
pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.production.yml";

/// Default orchestration binary
pub const DEFAULT_COMPOSE_BINARY: &str = "docker-compose";

/// A Docker Compose project rooted in a directory.
///
/// Every invocation is pinned to the project's compose file with `-f` and runs
/// with the project directory as its working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeProject {
    binary: String,
    file: PathBuf,
    project_dir: PathBuf,
}

impl ComposeProject {
    /// Create a project for `file`, resolved relative to the current directory.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            binary: DEFAULT_COMPOSE_BINARY.to_string(),
            file: file.into(),
            project_dir: PathBuf::from("."),
        }
    }

    /// Use a different orchestration binary (e.g. a wrapper script).
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = dir.into();
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Location of the compose file on disk.
    pub fn file_path(&self) -> PathBuf {
        self.project_dir.join(&self.file)
    }

    fn base(&self) -> Invocation {
        Invocation::new(&self.binary)
            .arg("-f")
            .arg(self.file.to_string_lossy())
            .current_dir(&self.project_dir)
    }

    /// Build all images defined by the compose file.
    pub fn build(&self) -> Invocation {
        self.base().arg("build")
    }

    /// Stop and remove the project's containers.
    pub fn down(&self) -> Invocation {
        self.base().arg("down")
    }

    /// Start containers in detached mode.
    pub fn up_detached(&self) -> Invocation {
        self.base().args(["up", "-d"])
    }

    /// Run a command in a running service container without a TTY.
    pub fn exec<I, S>(&self, service: &str, command: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base().args(["exec", "-T", service]).args(command)
    }

    /// Run a command in a running service container attached to the
    /// operator's terminal.
    pub fn exec_interactive<I, S>(&self, service: &str, command: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base()
            .args(["exec", service])
            .args(command)
            .interactive(true)
    }

    /// List the project's containers.
    pub fn ps(&self) -> Invocation {
        self.base().arg("ps")
    }

    /// Show container logs, optionally for one service.
    pub fn logs(&self, service: Option<&str>, follow: bool, tail: Option<u32>) -> Invocation {
        let mut invocation = self.base().arg("logs");
        if follow {
            invocation = invocation.arg("--follow");
        }
        if let Some(lines) = tail {
            invocation = invocation.arg(format!("--tail={}", lines));
        }
        if let Some(service) = service {
            invocation = invocation.arg(service);
        }
        invocation.interactive(follow)
    }

    /// Report the orchestration tool's version; used to check it is installed.
    pub fn version(&self) -> Invocation {
        Invocation::new(&self.binary)
            .arg("version")
            .current_dir(&self.project_dir)
    }
}

impl Default for ComposeProject {
    fn default() -> Self {
        Self::new(DEFAULT_COMPOSE_FILE)
    }
}
