//! Waiting for the database container after `up -d`.
//!
//! The default is a fixed pause. Probe mode polls a readiness command inside
//! the database container instead and gives up after a timeout.

use crate::error::{DeployError, DeployResult};
use compose::{CommandRunner, ComposeProject, Invocation};
use std::time::Duration;
use tokio::time::{sleep, timeout as time_limit, Instant};
use tracing::{debug, info, warn};

/// Fixed pause used when no readiness probe is configured
pub const DEFAULT_DATABASE_WAIT: Duration = Duration::from_secs(10);

pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(2);

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// How to decide the database is ready for migrations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Sleep unconditionally for the given duration
    Fixed(Duration),
    /// Run the readiness command every `interval` until it succeeds or
    /// `timeout` has elapsed
    Probe { interval: Duration, timeout: Duration },
}

impl Default for WaitStrategy {
    fn default() -> Self {
        WaitStrategy::Fixed(DEFAULT_DATABASE_WAIT)
    }
}

impl std::fmt::Display for WaitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitStrategy::Fixed(duration) => write!(f, "fixed {}s", duration.as_secs()),
            WaitStrategy::Probe { interval, timeout } => write!(
                f,
                "probe every {}s for up to {}s",
                interval.as_secs(),
                timeout.as_secs()
            ),
        }
    }
}

impl WaitStrategy {
    pub fn probe() -> Self {
        WaitStrategy::Probe {
            interval: DEFAULT_PROBE_INTERVAL,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if let WaitStrategy::Probe { interval, timeout } = self {
            if interval.is_zero() {
                return Err("Probe interval must be greater than 0".to_string());
            }
            if timeout < interval {
                return Err("Probe timeout must be at least one interval".to_string());
            }
        }
        Ok(())
    }
}

/// Wait for the database service according to `strategy`.
///
/// Returns how long the wait took. Probe failures are retried until the
/// timeout; they never abort the deployment on their own.
pub async fn wait_for_database(
    strategy: WaitStrategy,
    probe: &Invocation,
    service: &str,
    runner: &dyn CommandRunner,
) -> DeployResult<Duration> {
    match strategy {
        WaitStrategy::Fixed(duration) => {
            info!(service, seconds = duration.as_secs_f64(), "fixed wait");
            sleep(duration).await;
            Ok(duration)
        }
        WaitStrategy::Probe { interval, timeout } => {
            let started = Instant::now();
            let mut attempts = 0u32;

            loop {
                attempts += 1;
                // A hung attempt must not outlive the overall timeout.
                let remaining = timeout.saturating_sub(started.elapsed());
                let ready = time_limit(remaining, runner.probe(probe))
                    .await
                    .unwrap_or(false);
                if ready {
                    let waited = started.elapsed();
                    info!(service, attempts, waited_ms = waited.as_millis() as u64, "ready");
                    return Ok(waited);
                }

                let waited = started.elapsed();
                if waited >= timeout {
                    warn!(service, attempts, "readiness probe timed out");
                    return Err(DeployError::ReadinessTimeout {
                        service: service.to_string(),
                        waited,
                    });
                }

                debug!(service, attempts, "not ready yet");
                sleep(interval).await;
            }
        }
    }
}

/// Readiness command for a PostgreSQL service container.
pub fn postgres_probe(project: &ComposeProject, service: &str, command: &[String]) -> Invocation {
    project.exec(service, command.iter().cloned())
}
