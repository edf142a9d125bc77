//! Hubstrap
//!
//! A bootstrap hook that runs once before a user's notebook server is first
//! spawned. The host builds a [`Bootstrap`] gate for the user, awaits
//! [`Bootstrap::run`], and aborts the spawn when it returns a
//! [`BootstrapError`].

pub mod bootstrap;

pub use bootstrap::{
    Bootstrap, BootstrapConfig, BootstrapError, BootstrapStrategy, ConfigError, ConfigOverrides,
    NoopBootstrap, Outcome, RunOutcome, ScriptRunner, ScriptRunnerConfig, SpawnerRef, StrategyError,
    StrategyKind, UserRef, build_strategy,
};
