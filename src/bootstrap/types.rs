// Data types for Bootstrap module

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The user a bootstrap attempt runs for. Only the name is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub name: String,
}

impl UserRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The spawner that is about to start the user's server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnerRef {
    /// Named server, empty for the user's default server
    #[serde(default)]
    pub server_name: String,
}

impl SpawnerRef {
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
        }
    }
}

/// What a strategy reports after running to completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    /// Script exited non-zero; `None` when it was killed by a signal
    Failed { exit_code: Option<i32> },
    ScriptMissing { path: PathBuf },
    /// Script outlived its timeout and was killed
    TimedOut { after_secs: u64 },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Succeeded => write!(f, "succeeded"),
            Outcome::Failed {
                exit_code: Some(code),
            } => write!(f, "exited with code {}", code),
            Outcome::Failed { exit_code: None } => write!(f, "terminated by signal"),
            Outcome::ScriptMissing { path } => {
                write!(f, "script not found: {}", path.display())
            }
            Outcome::TimedOut { after_secs } => write!(f, "timed out after {}s", after_secs),
        }
    }
}

/// Result of the policy gate when the spawn may go ahead
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Strategy declined to run for this user/spawner pairing
    Skipped,
    Completed,
    /// Failure or error downgraded by `ignore_errors`
    SoftFailed { reason: String },
}

impl RunOutcome {
    pub fn is_soft_failure(&self) -> bool {
        matches!(self, RunOutcome::SoftFailed { .. })
    }
}
