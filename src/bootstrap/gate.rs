// Bootstrap policy gate

use crate::bootstrap::config::BootstrapConfig;
use crate::bootstrap::error::{BootstrapError, ConfigError, Result};
use crate::bootstrap::strategy::{BootstrapStrategy, build_strategy};
use crate::bootstrap::types::{RunOutcome, SpawnerRef, UserRef};
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

/// One bootstrap attempt for a user/spawner pairing.
///
/// Applies the `ignore_errors` policy to whatever the strategy reports:
/// either the spawn proceeds, or `run` returns a [`BootstrapError`] the
/// host uses to abort spawning for that user.
pub struct Bootstrap {
    user: UserRef,
    spawner: SpawnerRef,
    strategy: Arc<dyn BootstrapStrategy>,
    ignore_errors: bool,
}

impl Bootstrap {
    pub fn new(
        user: UserRef,
        spawner: SpawnerRef,
        strategy: Arc<dyn BootstrapStrategy>,
        ignore_errors: bool,
    ) -> Self {
        Self {
            user,
            spawner,
            strategy,
            ignore_errors,
        }
    }

    /// Build the configured strategy and wrap it in a gate
    pub fn from_config(
        user: UserRef,
        spawner: SpawnerRef,
        config: &BootstrapConfig,
    ) -> std::result::Result<Self, ConfigError> {
        let strategy = build_strategy(config)?;
        Ok(Self::new(user, spawner, strategy, config.ignore_errors))
    }

    pub fn user(&self) -> &UserRef {
        &self.user
    }

    pub fn spawner(&self) -> &SpawnerRef {
        &self.spawner
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn ignore_errors(&self) -> bool {
        self.ignore_errors
    }

    /// Run the strategy once and decide whether the spawn may proceed
    pub async fn run(&self) -> Result<RunOutcome> {
        let span = info_span!(
            "bootstrap",
            attempt = %Uuid::new_v4(),
            user = %self.user.name,
            server = %self.spawner.server_name,
            strategy = self.strategy.name(),
        );

        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> Result<RunOutcome> {
        if !self.strategy.can_run(&self.user, &self.spawner) {
            info!("bootstrap not applicable, skipping");
            return Ok(RunOutcome::Skipped);
        }

        info!(user = %self.user.name, "bootstrap for user");

        match self.strategy.attempt_bootstrap(&self.user).await {
            Ok(outcome) if outcome.is_success() => Ok(RunOutcome::Completed),
            Ok(outcome) => {
                if !self.ignore_errors {
                    error!(outcome = %outcome, "bootstrap failed, error cannot be ignored");
                    return Err(BootstrapError::Failed {
                        user: self.user.name.clone(),
                        outcome,
                    });
                }
                warn!(outcome = %outcome, "bootstrap failed, ignoring");
                Ok(RunOutcome::SoftFailed {
                    reason: outcome.to_string(),
                })
            }
            Err(e) => {
                error!(error = %e, "bootstrap process failed for user");
                if !self.ignore_errors {
                    return Err(BootstrapError::Errored {
                        user: self.user.name.clone(),
                        source: e,
                    });
                }
                Ok(RunOutcome::SoftFailed {
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl std::fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrap")
            .field("user", &self.user)
            .field("spawner", &self.spawner)
            .field("strategy", &self.strategy.name())
            .field("ignore_errors", &self.ignore_errors)
            .finish()
    }
}
