//! The operator-supplied `.env` file.
//!
//! Deployment only checks that the file exists. Its contents belong to the
//! containers; [`read_keys`] exists for the preflight report and never writes.

use crate::error::{DeployError, DeployResult};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_ENV_FILE: &str = ".env";

/// Variables the Django production settings and the Postgres container read.
pub const APPLICATION_KEYS: &[&str] = &[
    "SECRET_KEY",
    "DEBUG",
    "ALLOWED_HOSTS",
    "POSTGRES_DB",
    "POSTGRES_USER",
    "POSTGRES_PASSWORD",
    "POSTGRES_HOST",
    "POSTGRES_PORT",
    "CSRF_TRUSTED_ORIGINS",
];

/// Fail with [`DeployError::MissingEnvFile`] unless `path` exists.
pub fn require_env_file(path: &Path) -> DeployResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(DeployError::MissingEnvFile(path.to_path_buf()))
    }
}

/// Parse the file into key/value pairs without touching the process environment.
pub fn read_keys(path: &Path) -> DeployResult<BTreeMap<String, String>> {
    let to_error = |source| DeployError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    let mut vars = BTreeMap::new();
    for item in dotenvy::from_path_iter(path).map_err(to_error)? {
        let (key, value) = item.map_err(to_error)?;
        vars.insert(key, value);
    }
    Ok(vars)
}

/// Application keys absent from `vars`, in [`APPLICATION_KEYS`] order.
pub fn missing_keys(vars: &BTreeMap<String, String>) -> Vec<String> {
    APPLICATION_KEYS
        .iter()
        .filter(|key| !vars.contains_key(**key))
        .map(|key| key.to_string())
        .collect()
}

/// Application keys present in `vars` with a blank value.
pub fn empty_keys(vars: &BTreeMap<String, String>) -> Vec<String> {
    APPLICATION_KEYS
        .iter()
        .filter(|key| vars.get(**key).is_some_and(|v| v.trim().is_empty()))
        .map(|key| key.to_string())
        .collect()
}
