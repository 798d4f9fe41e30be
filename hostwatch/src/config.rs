use crate::termination::TerminationPolicy;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "HOSTWATCH_CONFIG";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub termination: TerminationConfig,
    pub alert: AlertConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub refresh_rate_ms: u64,
    /// Samples kept per history series.
    pub history_length: usize,
    pub proc_root: PathBuf,
    pub sys_root: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            refresh_rate_ms: 1000,
            history_length: 120,
            proc_root: PathBuf::from("/proc"),
            sys_root: PathBuf::from("/sys"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TerminationConfig {
    /// How long to wait for the process to exit after SIGTERM.
    pub wait_budget_ms: u64,
    pub poll_interval_ms: u64,
    /// Pause after SIGKILL before the final liveness check.
    pub settle_ms: u64,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            wait_budget_ms: 500,
            poll_interval_ms: 50,
            settle_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AlertConfig {
    pub enabled: bool,
    pub cpu_threshold: f32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cpu_threshold: 80.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Append log output here instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// The file [`Config::load`] reads: `path` if given, else
    /// `$HOSTWATCH_CONFIG`, else none.
    pub fn resolve_path(path: Option<&Path>) -> Option<PathBuf> {
        path.map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
    }

    /// Load from `path`, else from `$HOSTWATCH_CONFIG`, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = Self::resolve_path(path) else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.runtime.refresh_rate_ms == 0 {
            bail!("runtime.refresh_rate_ms must be positive");
        }
        if self.runtime.history_length == 0 {
            bail!("runtime.history_length must be positive");
        }
        if self.termination.poll_interval_ms == 0 {
            bail!("termination.poll_interval_ms must be positive");
        }
        let threshold = self.alert.cpu_threshold;
        if !(threshold > 0.0 && threshold <= 100.0) {
            bail!("alert.cpu_threshold must be in (0, 100], got {threshold}");
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.runtime.refresh_rate_ms)
    }

    pub fn termination_policy(&self) -> TerminationPolicy {
        TerminationPolicy {
            wait_budget: Duration::from_millis(self.termination.wait_budget_ms),
            poll_interval: Duration::from_millis(self.termination.poll_interval_ms),
            settle: Duration::from_millis(self.termination.settle_ms),
        }
    }
}
