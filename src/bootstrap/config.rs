// Bootstrap configuration

use crate::bootstrap::error::ConfigError;
use crate::bootstrap::strategy::StrategyKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

pub const ENV_CLASS: &str = "HUBSTRAP_CLASS";
pub const ENV_IGNORE_ERRORS: &str = "HUBSTRAP_IGNORE_ERRORS";
pub const ENV_SCRIPT: &str = "HUBSTRAP_SCRIPT";
pub const ENV_EXECUTION_TIMEOUT: &str = "HUBSTRAP_EXECUTION_TIMEOUT";

/// Script runner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptRunnerConfig {
    /// Script to run, the user name is passed as its only argument (default: bootstrap.sh)
    pub script: PathBuf,
    /// Seconds to wait for the script to terminate (default: 120)
    pub execution_timeout_secs: u64,
    /// Working directory for the script (default: inherited)
    pub working_dir: Option<PathBuf>,
}

impl Default for ScriptRunnerConfig {
    fn default() -> Self {
        Self {
            script: PathBuf::from("bootstrap.sh"),
            execution_timeout_secs: 120,
            working_dir: None,
        }
    }
}

impl ScriptRunnerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.script.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("script path is empty".to_string()));
        }
        if self.execution_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "execution_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Values set explicitly by the caller, applied after file and environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub class: Option<StrategyKind>,
    pub ignore_errors: Option<bool>,
    pub script: Option<PathBuf>,
    pub execution_timeout_secs: Option<u64>,
}

/// Bootstrap configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapConfig {
    /// Strategy to instantiate (default: none)
    pub class: StrategyKind,
    /// Downgrade bootstrap failures to warnings instead of aborting the spawn (default: true)
    pub ignore_errors: bool,
    /// Settings for the script runner strategy
    pub script_runner: ScriptRunnerConfig,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            class: StrategyKind::None,
            ignore_errors: true,
            script_runner: ScriptRunnerConfig::default(),
        }
    }
}

impl BootstrapConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BootstrapConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse without validating, later layers may still fix the values
    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: BootstrapConfig = toml::from_str(&content)?;
        debug!(path = %path.display(), class = %config.class, "loaded bootstrap config");
        Ok(config)
    }

    /// Resolve from `file` (or defaults), then the process environment (and `.env`), then `overrides`
    pub fn resolve(file: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::resolve_with(file, |name| std::env::var(name).ok(), overrides)
    }

    /// Like [`BootstrapConfig::resolve`], reading the environment through `lookup`
    pub fn resolve_with<F>(
        file: Option<&Path>,
        lookup: F,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match file {
            Some(path) => Self::read_file(path)?,
            None => Self::default(),
        };
        config.apply_env_with(lookup);
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(class) = overrides.class {
            self.class = class;
        }
        if let Some(ignore_errors) = overrides.ignore_errors {
            self.ignore_errors = ignore_errors;
        }
        if let Some(script) = &overrides.script {
            self.script_runner.script = script.clone();
        }
        if let Some(timeout) = overrides.execution_timeout_secs {
            self.script_runner.execution_timeout_secs = timeout;
        }
    }

    /// Overlay values from `lookup`. Invalid values are logged and skipped.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.class = parse_env_var(&lookup, ENV_CLASS, self.class);
        self.ignore_errors = match lookup(ENV_IGNORE_ERRORS) {
            Some(v) => match parse_flag(&v) {
                Some(flag) => flag,
                None => {
                    warn!(var = ENV_IGNORE_ERRORS, value = %v, "Invalid env var value, using default");
                    self.ignore_errors
                }
            },
            None => self.ignore_errors,
        };
        if let Some(script) = lookup(ENV_SCRIPT).filter(|s| !s.is_empty()) {
            self.script_runner.script = PathBuf::from(script);
        }
        self.script_runner.execution_timeout_secs = parse_env_var(
            &lookup,
            ENV_EXECUTION_TIMEOUT,
            self.script_runner.execution_timeout_secs,
        );
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.class {
            StrategyKind::None => Ok(()),
            StrategyKind::ScriptRunner => self.script_runner.validate(),
        }
    }
}

/// Parse an environment variable, logging a warning if the value is present but invalid.
fn parse_env_var<T, F>(lookup: &F, name: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) => match v.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(var = name, value = %v, "Invalid env var value, using default");
                default
            }
        },
        None => default,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
