use crate::steps::Step;
use compose::RunError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this tool
    #[error("Invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range or empty
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that end a deployment or an operator command
#[derive(Error, Debug)]
pub enum DeployError {
    /// The operator-supplied environment file is absent
    #[error("Environment file '{}' not found. Create it before deploying.", .0.display())]
    MissingEnvFile(PathBuf),

    /// A deployment step's external command failed
    #[error("Step '{step}' failed: {source}")]
    Step {
        step: Step,
        #[source]
        source: RunError,
    },

    /// An operator command failed
    #[error(transparent)]
    Command(#[from] RunError),

    /// The database never answered the readiness probe
    #[error("Service '{service}' was not ready after {}s", .waited.as_secs())]
    ReadinessTimeout { service: String, waited: Duration },

    /// The environment file exists but could not be parsed
    #[error("Failed to read environment file '{path}': {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    /// Preflight checks found blocking problems
    #[error("Preflight check found {0} blocking problem(s)")]
    CheckFailed(usize),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    /// Exit status the process should terminate with for this error.
    ///
    /// A failing external command passes its own exit code through; everything
    /// else exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployError::Step { source, .. } => source.exit_code(),
            DeployError::Command(source) => source.exit_code(),
            _ => 1,
        }
    }
}

pub type DeployResult<T> = Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_file_exits_with_one() {
        let error = DeployError::MissingEnvFile(PathBuf::from("/srv/app/.env"));
        assert_eq!(error.exit_code(), 1);
        assert!(error.to_string().contains("/srv/app/.env"));
    }

    #[test]
    fn test_step_failure_passes_exit_code_through() {
        let error = DeployError::Step {
            step: Step::Build,
            source: RunError::Failed {
                command: "docker-compose -f docker-compose.production.yml build".to_string(),
                code: Some(17),
            },
        };
        assert_eq!(error.exit_code(), 17);
        assert!(error.to_string().contains("build"));
    }

    #[test]
    fn test_missing_tool_exits_with_127() {
        let error = DeployError::Step {
            step: Step::UpdateSource,
            source: RunError::Spawn {
                command: "git pull".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
            },
        };
        assert_eq!(error.exit_code(), 127);
    }

    #[test]
    fn test_readiness_timeout_display() {
        let error = DeployError::ReadinessTimeout {
            service: "db".to_string(),
            waited: Duration::from_secs(60),
        };
        assert_eq!(error.exit_code(), 1);
        assert_eq!(error.to_string(), "Service 'db' was not ready after 60s");
    }
}
