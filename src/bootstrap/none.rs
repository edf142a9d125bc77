// No-op strategy

use crate::bootstrap::error::StrategyError;
use crate::bootstrap::strategy::BootstrapStrategy;
use crate::bootstrap::types::{Outcome, UserRef};
use async_trait::async_trait;

/// Default strategy for deployments that need no bootstrapping
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBootstrap;

#[async_trait]
impl BootstrapStrategy for NoopBootstrap {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn attempt_bootstrap(&self, _user: &UserRef) -> Result<Outcome, StrategyError> {
        Ok(Outcome::Succeeded)
    }
}
