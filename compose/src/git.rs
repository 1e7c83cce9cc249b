use crate::invocation::Invocation;
use std::path::{Path, PathBuf};

/// A source checkout that may or may not be under version control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCheckout {
    binary: String,
    dir: PathBuf,
}

impl GitCheckout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: "git".to_string(),
            dir: dir.into(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the directory carries git metadata. `.git` may be a file for
    /// worktrees and submodules, so any entry counts.
    pub fn is_present(&self) -> bool {
        self.dir.join(".git").exists()
    }

    /// Fetch and merge upstream changes into the current branch.
    pub fn pull(&self) -> Invocation {
        Invocation::new(&self.binary)
            .arg("pull")
            .current_dir(&self.dir)
    }

    pub fn version(&self) -> Invocation {
        Invocation::new(&self.binary).arg("--version")
    }
}
