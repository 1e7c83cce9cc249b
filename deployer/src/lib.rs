pub mod config;
pub mod deployment;
pub mod envfile;
pub mod error;
pub mod ops;
pub mod readiness;
pub mod steps;

pub use config::{DeployConfig, FileConfig, WaitMode, WaitSection, CONFIG_FILE};
pub use deployment::{Deployment, DeploymentReport, StepOutcome};
pub use envfile::{require_env_file, APPLICATION_KEYS, DEFAULT_ENV_FILE};
pub use error::{ConfigError, ConfigResult, DeployError, DeployResult};
pub use ops::CheckReport;
pub use readiness::{wait_for_database, WaitStrategy, DEFAULT_DATABASE_WAIT};
pub use steps::Step;
