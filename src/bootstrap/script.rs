// External script strategy

use crate::bootstrap::config::ScriptRunnerConfig;
use crate::bootstrap::error::{ConfigError, StrategyError};
use crate::bootstrap::strategy::BootstrapStrategy;
use crate::bootstrap::types::{Outcome, UserRef};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Runs `<script> <username>` and waits for it with a timeout.
///
/// The script is launched once per call, never retried. It must tolerate
/// being run again for the same user.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    config: ScriptRunnerConfig,
}

impl ScriptRunner {
    pub fn new(config: ScriptRunnerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScriptRunnerConfig {
        &self.config
    }
}

#[async_trait]
impl BootstrapStrategy for ScriptRunner {
    fn name(&self) -> &'static str {
        "script_runner"
    }

    async fn attempt_bootstrap(&self, user: &UserRef) -> Result<Outcome, StrategyError> {
        let script = &self.config.script;
        let timeout_secs = self.config.execution_timeout_secs;
        let start = Instant::now();

        debug!(script = %script.display(), user = %user.name, "starting configured script");

        let mut command = Command::new(script);
        command
            .arg(&user.name)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        // Own process group, so a timeout can take down everything the script started
        #[cfg(unix)]
        command.process_group(0);

        if let Some(dir) = &self.config.working_dir {
            // ENOENT from a missing working dir is indistinguishable from a missing script
            if !dir.is_dir() {
                error!(working_dir = %dir.display(), "working directory for script runner not found");
                return Err(StrategyError::WorkingDir {
                    path: dir.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "not an existing directory",
                    ),
                });
            }
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!(
                    script = %script.display(),
                    "configured script file not found for script runner"
                );
                return Ok(Outcome::ScriptMissing {
                    path: script.clone(),
                });
            }
            Err(e) => {
                return Err(StrategyError::Launch {
                    path: script.clone(),
                    source: e,
                });
            }
        };

        let waited = timeout(Duration::from_secs(timeout_secs), child.wait()).await;

        let status = match waited {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                return Err(StrategyError::Wait {
                    path: script.clone(),
                    source: e,
                });
            }
            Err(_) => {
                warn!(
                    script = %script.display(),
                    timeout_secs = timeout_secs,
                    "script exceeded execution timeout, terminating"
                );
                terminate(&mut child).await.map_err(|e| StrategyError::Terminate {
                    path: script.clone(),
                    source: e,
                })?;
                return Ok(Outcome::TimedOut {
                    after_secs: timeout_secs,
                });
            }
        };

        let exit_code = status.code();

        info!(
            script = %script.display(),
            duration_ms = start.elapsed().as_millis() as u64,
            exit_code = exit_code.unwrap_or(-1),
            "script finished"
        );

        if status.success() {
            Ok(Outcome::Succeeded)
        } else {
            Ok(Outcome::Failed { exit_code })
        }
    }
}

/// Kill the script's whole process group, then reap the script itself
#[cfg(unix)]
async fn terminate(child: &mut Child) -> std::io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            // Group already gone
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => return Err(e.into()),
        }
    }
    child.wait().await.map(|_| ())
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child) -> std::io::Result<()> {
    child.kill().await
}
