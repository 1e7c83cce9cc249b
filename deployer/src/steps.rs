use serde::Serialize;

/// One stage of the deployment sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    /// Fetch and merge upstream changes (only when the directory is a git checkout)
    UpdateSource,
    /// Build all images from the compose file
    Build,
    /// Stop and remove the running containers
    StopOld,
    /// Start the new containers detached
    StartNew,
    /// Give the database time to accept connections
    WaitForDatabase,
    /// Apply Django schema migrations
    Migrate,
    /// Collect static assets into the shared volume
    CollectStatic,
}

impl Step {
    /// Every step in execution order.
    pub const ALL: [Step; 7] = [
        Step::UpdateSource,
        Step::Build,
        Step::StopOld,
        Step::StartNew,
        Step::WaitForDatabase,
        Step::Migrate,
        Step::CollectStatic,
    ];

    /// Human-readable progress line for the operator.
    pub fn description(&self) -> &'static str {
        match self {
            Step::UpdateSource => "Pulling latest changes",
            Step::Build => "Building images",
            Step::StopOld => "Stopping old containers",
            Step::StartNew => "Starting new containers",
            Step::WaitForDatabase => "Waiting for database",
            Step::Migrate => "Running migrations",
            Step::CollectStatic => "Collecting static files",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::UpdateSource => write!(f, "update-source"),
            Step::Build => write!(f, "build"),
            Step::StopOld => write!(f, "stop-old"),
            Step::StartNew => write!(f, "start-new"),
            Step::WaitForDatabase => write!(f, "wait-for-database"),
            Step::Migrate => write!(f, "migrate"),
            Step::CollectStatic => write!(f, "collect-static"),
        }
    }
}

/// Argument vector for a Django management command run inside a container.
pub fn manage_py(args: &[&str]) -> Vec<String> {
    ["python", "manage.py"]
        .iter()
        .chain(args)
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order() {
        assert_eq!(Step::ALL.first(), Some(&Step::UpdateSource));
        assert_eq!(Step::ALL.last(), Some(&Step::CollectStatic));
        let wait = Step::ALL
            .iter()
            .position(|s| *s == Step::WaitForDatabase)
            .unwrap();
        let migrate = Step::ALL.iter().position(|s| *s == Step::Migrate).unwrap();
        assert!(wait < migrate);
    }

    #[test]
    fn test_step_display_matches_serde() {
        for step in Step::ALL {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(json, format!("\"{}\"", step));
        }
    }

    #[test]
    fn test_manage_py() {
        assert_eq!(
            manage_py(&["migrate", "--noinput"]),
            vec!["python", "manage.py", "migrate", "--noinput"]
        );
    }
}
