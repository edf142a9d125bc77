// Strategy trait and built-in variants

use crate::bootstrap::config::BootstrapConfig;
use crate::bootstrap::error::{ConfigError, StrategyError};
use crate::bootstrap::none::NoopBootstrap;
use crate::bootstrap::script::ScriptRunner;
use crate::bootstrap::types::{Outcome, SpawnerRef, UserRef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// A pluggable bootstrap action, run before a user's first spawn
#[async_trait]
pub trait BootstrapStrategy: Send + Sync {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Whether this strategy applies to the given user/spawner pairing
    fn can_run(&self, _user: &UserRef, _spawner: &SpawnerRef) -> bool {
        true
    }

    /// Run the bootstrap action once.
    ///
    /// `Ok` carries a completed attempt, successful or not. `Err` is reserved
    /// for failures outside the strategy's normal reporting path.
    async fn attempt_bootstrap(&self, user: &UserRef) -> Result<Outcome, StrategyError>;
}

/// Built-in strategy selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    #[serde(alias = "BootstrapNone")]
    None,
    #[serde(alias = "BootstrapScriptRunner")]
    ScriptRunner,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::None => "none",
            StrategyKind::ScriptRunner => "script_runner",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" | "BootstrapNone" => Ok(StrategyKind::None),
            "script_runner" | "BootstrapScriptRunner" => Ok(StrategyKind::ScriptRunner),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instantiate the strategy selected by `config.class`
pub fn build_strategy(
    config: &BootstrapConfig,
) -> Result<Arc<dyn BootstrapStrategy>, ConfigError> {
    debug!(class = %config.class, "building bootstrap strategy");

    let strategy: Arc<dyn BootstrapStrategy> = match config.class {
        StrategyKind::None => Arc::new(NoopBootstrap),
        StrategyKind::ScriptRunner => Arc::new(ScriptRunner::new(config.script_runner.clone())?),
    };

    Ok(strategy)
}
