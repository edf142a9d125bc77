// Bootstrap module - per-user setup before the first spawn

pub mod config;
pub mod error;
pub mod gate;
pub mod none;
pub mod script;
pub mod strategy;
pub mod types;

pub use config::{BootstrapConfig, ConfigOverrides, ScriptRunnerConfig};
pub use error::{BootstrapError, ConfigError, Result, StrategyError};
pub use gate::Bootstrap;
pub use none::NoopBootstrap;
pub use script::ScriptRunner;
pub use strategy::{BootstrapStrategy, StrategyKind, build_strategy};
pub use types::{Outcome, RunOutcome, SpawnerRef, UserRef};
