use crate::envfile::DEFAULT_ENV_FILE;
use crate::error::{ConfigError, ConfigResult};
use crate::readiness::{WaitStrategy, DEFAULT_PROBE_INTERVAL, DEFAULT_PROBE_TIMEOUT};
use compose::{ComposeProject, GitCheckout, DEFAULT_COMPOSE_BINARY, DEFAULT_COMPOSE_FILE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the optional per-project config file
pub const CONFIG_FILE: &str = "shipyard.toml";

/// Everything a deployment or operator command needs to know about the project.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployConfig {
    /// Directory holding the compose file, `.env` and (optionally) `.git`
    pub project_dir: PathBuf,
    /// Compose file, relative to `project_dir` unless absolute
    pub compose_file: PathBuf,
    pub compose_binary: String,
    /// Environment file, relative to `project_dir` unless absolute
    pub env_file: PathBuf,
    pub git_binary: String,
    /// Service running Django
    pub web_service: String,
    /// Service running PostgreSQL
    pub db_service: String,
    pub wait: WaitStrategy,
    /// Command run in the database container when probing readiness
    pub readiness_command: Vec<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            compose_file: PathBuf::from(DEFAULT_COMPOSE_FILE),
            compose_binary: DEFAULT_COMPOSE_BINARY.to_string(),
            env_file: PathBuf::from(DEFAULT_ENV_FILE),
            git_binary: "git".to_string(),
            web_service: "web".to_string(),
            db_service: "db".to_string(),
            wait: WaitStrategy::default(),
            readiness_command: vec!["pg_isready".to_string()],
        }
    }
}

impl DeployConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = dir.into();
        self
    }

    pub fn with_compose_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.compose_file = file.into();
        self
    }

    pub fn with_compose_binary(mut self, binary: impl Into<String>) -> Self {
        self.compose_binary = binary.into();
        self
    }

    pub fn with_env_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.env_file = file.into();
        self
    }

    pub fn with_git_binary(mut self, binary: impl Into<String>) -> Self {
        self.git_binary = binary.into();
        self
    }

    pub fn with_web_service(mut self, service: impl Into<String>) -> Self {
        self.web_service = service.into();
        self
    }

    pub fn with_db_service(mut self, service: impl Into<String>) -> Self {
        self.db_service = service.into();
        self
    }

    pub fn with_wait(mut self, wait: WaitStrategy) -> Self {
        self.wait = wait;
        self
    }

    /// Load configuration for `project_dir`.
    ///
    /// An explicit `config_path` must exist. Without one, `shipyard.toml` in the
    /// project directory is used when present and defaults otherwise.
    pub fn load(project_dir: &Path, config_path: Option<&Path>) -> ConfigResult<Self> {
        let config = Self::default().with_project_dir(project_dir);

        let path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let candidate = project_dir.join(CONFIG_FILE);
                candidate.is_file().then_some(candidate)
            }
        };

        let config = match path {
            Some(path) => {
                let contents =
                    std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                        path: path.clone(),
                        source,
                    })?;
                let file: FileConfig = toml::from_str(&contents)
                    .map_err(|source| ConfigError::Parse { path, source })?;
                config.merge(file)
            }
            None => config,
        };

        config.validate()?;
        Ok(config)
    }

    /// Overlay values present in a config file.
    pub fn merge(mut self, file: FileConfig) -> Self {
        if let Some(v) = file.compose_file {
            self.compose_file = v;
        }
        if let Some(v) = file.compose_binary {
            self.compose_binary = v;
        }
        if let Some(v) = file.env_file {
            self.env_file = v;
        }
        if let Some(v) = file.git_binary {
            self.git_binary = v;
        }
        if let Some(v) = file.web_service {
            self.web_service = v;
        }
        if let Some(v) = file.db_service {
            self.db_service = v;
        }
        if let Some(wait) = file.wait {
            if let Some(command) = wait.readiness_command.clone() {
                self.readiness_command = command;
            }
            self.wait = wait.into_strategy();
        }
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.compose_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "Compose file cannot be empty".to_string(),
            ));
        }

        if self.env_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "Environment file cannot be empty".to_string(),
            ));
        }

        for (name, value) in [
            ("Compose binary", &self.compose_binary),
            ("Git binary", &self.git_binary),
            ("Web service", &self.web_service),
            ("Database service", &self.db_service),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} cannot be empty", name)));
            }
        }

        if self.readiness_command.is_empty() {
            return Err(ConfigError::Invalid(
                "Readiness command cannot be empty".to_string(),
            ));
        }

        self.wait.validate().map_err(ConfigError::Invalid)
    }

    pub fn env_file_path(&self) -> PathBuf {
        self.project_dir.join(&self.env_file)
    }

    pub fn compose_project(&self) -> ComposeProject {
        ComposeProject::new(&self.compose_file)
            .with_binary(&self.compose_binary)
            .with_project_dir(&self.project_dir)
    }

    pub fn checkout(&self) -> GitCheckout {
        GitCheckout::new(&self.project_dir).with_binary(&self.git_binary)
    }
}

/// On-disk shape of `shipyard.toml`. Every field is optional.
///
/// ```toml
/// compose_file = "docker-compose.production.yml"
/// web_service = "web"
///
/// [wait]
/// mode = "probe"
/// interval_secs = 2
/// timeout_secs = 60
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub compose_file: Option<PathBuf>,
    pub compose_binary: Option<String>,
    pub env_file: Option<PathBuf>,
    pub git_binary: Option<String>,
    pub web_service: Option<String>,
    pub db_service: Option<String>,
    pub wait: Option<WaitSection>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitMode {
    #[default]
    Fixed,
    Probe,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaitSection {
    #[serde(default)]
    pub mode: WaitMode,
    /// Length of a fixed wait
    pub seconds: Option<u64>,
    pub interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub readiness_command: Option<Vec<String>>,
}

impl WaitSection {
    fn into_strategy(self) -> WaitStrategy {
        match self.mode {
            WaitMode::Fixed => match self.seconds {
                Some(secs) => WaitStrategy::Fixed(Duration::from_secs(secs)),
                None => WaitStrategy::default(),
            },
            WaitMode::Probe => WaitStrategy::Probe {
                interval: self
                    .interval_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_PROBE_INTERVAL),
                timeout: self
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_PROBE_TIMEOUT),
            },
        }
    }
}
