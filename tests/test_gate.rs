// Integration tests for the bootstrap policy gate
// This file should be run with cargo test --test test_gate

use async_trait::async_trait;
use hubstrap::{
    Bootstrap, BootstrapConfig, BootstrapError, BootstrapStrategy, NoopBootstrap, Outcome,
    RunOutcome, SpawnerRef, StrategyError, StrategyKind, UserRef,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_test::{assert_err, assert_ok};

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    });
}

/// Test strategy with a fixed result that counts its invocations
struct FixedStrategy {
    result: fn() -> Result<Outcome, StrategyError>,
    allowed: bool,
    calls: AtomicUsize,
}

impl FixedStrategy {
    fn new(result: fn() -> Result<Outcome, StrategyError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            allowed: true,
            calls: AtomicUsize::new(0),
        })
    }

    fn disallowed(result: fn() -> Result<Outcome, StrategyError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            allowed: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BootstrapStrategy for FixedStrategy {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn can_run(&self, _user: &UserRef, _spawner: &SpawnerRef) -> bool {
        self.allowed
    }

    async fn attempt_bootstrap(&self, _user: &UserRef) -> Result<Outcome, StrategyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.result)()
    }
}

fn failed() -> Result<Outcome, StrategyError> {
    Ok(Outcome::Failed { exit_code: Some(3) })
}

fn errored() -> Result<Outcome, StrategyError> {
    Err(StrategyError::Other("disk on fire".into()))
}

fn succeeded() -> Result<Outcome, StrategyError> {
    Ok(Outcome::Succeeded)
}

fn gate(strategy: Arc<dyn BootstrapStrategy>, ignore_errors: bool) -> Bootstrap {
    Bootstrap::new(
        UserRef::new("alice"),
        SpawnerRef::default(),
        strategy,
        ignore_errors,
    )
}

/// Writer that appends formatted log output to a shared buffer
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn count(&self, needle: &str) -> usize {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}

/// Run `bootstrap` with a thread-local subscriber that records its log lines
async fn run_captured(
    bootstrap: &Bootstrap,
) -> (Result<RunOutcome, BootstrapError>, CapturedLogs) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let _guard = tracing::subscriber::set_default(subscriber);
    let result = bootstrap.run().await;
    (result, logs)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The no-op strategy never blocks a spawn, whatever the policy
    #[tokio::test]
    async fn test_noop_completes_under_both_policies() {
        init_tracing();

        for ignore_errors in [true, false] {
            let result = gate(Arc::new(NoopBootstrap), ignore_errors).run().await;
            assert_eq!(assert_ok!(result), RunOutcome::Completed);
        }
    }

    /// Default config builds the no-op strategy with ignore_errors on
    #[tokio::test]
    async fn test_from_default_config() {
        init_tracing();

        let bootstrap = assert_ok!(Bootstrap::from_config(
            UserRef::new("alice"),
            SpawnerRef::new("gpu"),
            &BootstrapConfig::default(),
        ));
        assert_eq!(bootstrap.strategy_name(), "none");
        assert!(bootstrap.ignore_errors());
        assert_eq!(bootstrap.spawner().server_name, "gpu");
        assert_eq!(assert_ok!(bootstrap.run().await), RunOutcome::Completed);
    }

    /// A reported failure aborts the spawn when errors cannot be ignored
    #[tokio::test]
    async fn test_failure_fails_fast() {
        init_tracing();

        let strategy = FixedStrategy::new(failed);
        let err = assert_err!(gate(strategy.clone(), false).run().await);

        match err {
            BootstrapError::Failed { user, outcome } => {
                assert_eq!(user, "alice");
                assert_eq!(outcome, Outcome::Failed { exit_code: Some(3) });
            }
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(strategy.calls(), 1);
    }

    /// A reported failure becomes a soft failure when errors are ignored
    #[tokio::test]
    async fn test_failure_ignored() {
        init_tracing();

        let result = gate(FixedStrategy::new(failed), true).run().await;
        let outcome = assert_ok!(result);

        assert!(outcome.is_soft_failure());
        assert_eq!(
            outcome,
            RunOutcome::SoftFailed {
                reason: "exited with code 3".to_string()
            }
        );
    }

    /// An unexpected error is wrapped and keeps its cause
    #[tokio::test]
    async fn test_error_fails_fast_with_source() {
        init_tracing();

        let err = assert_err!(gate(FixedStrategy::new(errored), false).run().await);

        assert!(matches!(err, BootstrapError::Errored { ref user, .. } if user == "alice"));
        let source = std::error::Error::source(&err).expect("Errored should carry a source");
        assert!(source.to_string().contains("disk on fire"));
    }

    /// An unexpected error is downgraded when errors are ignored
    #[tokio::test]
    async fn test_error_ignored() {
        init_tracing();

        let outcome = assert_ok!(gate(FixedStrategy::new(errored), true).run().await);

        match outcome {
            RunOutcome::SoftFailed { reason } => assert!(reason.contains("disk on fire")),
            other => panic!("expected SoftFailed, got {:?}", other),
        }
    }

    /// An ineligible pairing proceeds without running the strategy
    #[tokio::test]
    async fn test_skipped_when_strategy_cannot_run() {
        init_tracing();

        let strategy = FixedStrategy::disallowed(errored);
        let result = gate(strategy.clone(), false).run().await;

        assert_eq!(assert_ok!(result), RunOutcome::Skipped);
        assert_eq!(strategy.calls(), 0);
    }

    /// Each run invokes the strategy exactly once
    #[tokio::test]
    async fn test_one_invocation_per_run() {
        init_tracing();

        let strategy = FixedStrategy::new(succeeded);
        let bootstrap = gate(strategy.clone(), false);

        assert_ok!(bootstrap.run().await);
        assert_ok!(bootstrap.run().await);
        assert_eq!(strategy.calls(), 2);
    }

    /// Timeouts and missing scripts go through the same policy as failures
    #[tokio::test]
    async fn test_timeout_and_missing_are_failures() {
        init_tracing();

        fn timed_out() -> Result<Outcome, StrategyError> {
            Ok(Outcome::TimedOut { after_secs: 5 })
        }
        fn missing() -> Result<Outcome, StrategyError> {
            Ok(Outcome::ScriptMissing {
                path: "nope.sh".into(),
            })
        }

        let err = assert_err!(gate(FixedStrategy::new(timed_out), false).run().await);
        assert!(err.to_string().contains("timed out after 5s"));

        let err = assert_err!(gate(FixedStrategy::new(missing), false).run().await);
        assert!(err.to_string().contains("script not found"));

        let outcome = assert_ok!(gate(FixedStrategy::new(timed_out), true).run().await);
        assert!(outcome.is_soft_failure());
    }

    /// Script runner config is validated when the gate is built
    #[tokio::test]
    async fn test_from_config_rejects_invalid_script_runner() {
        init_tracing();

        let mut config = BootstrapConfig {
            class: StrategyKind::ScriptRunner,
            ..Default::default()
        };
        config.script_runner.execution_timeout_secs = 0;

        let result = Bootstrap::from_config(UserRef::new("alice"), SpawnerRef::default(), &config);
        assert!(result.is_err(), "Zero timeout should be rejected");
    }

    /// A successful run logs the start line exactly once
    #[tokio::test]
    async fn test_success_logs_start_once() {
        let (result, logs) = run_captured(&gate(FixedStrategy::new(succeeded), false)).await;

        assert_eq!(assert_ok!(result), RunOutcome::Completed);
        assert_eq!(logs.count("bootstrap for user"), 1);
    }

    /// A skipped run never logs the start line
    #[tokio::test]
    async fn test_skipped_run_logs_no_start() {
        let (result, logs) = run_captured(&gate(FixedStrategy::disallowed(succeeded), false)).await;

        assert_eq!(assert_ok!(result), RunOutcome::Skipped);
        assert_eq!(logs.count("bootstrap for user"), 0);
        assert_eq!(logs.count("bootstrap not applicable"), 1);
    }
}
