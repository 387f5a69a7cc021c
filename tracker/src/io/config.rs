//! Tracker configuration stored in `tracker.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::DEFAULT_MAX_RETRIES;

/// Tracker configuration (TOML).
///
/// Intended to be edited by humans. Missing fields default to immediate
/// retries, no action timeout and no per-run step limit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackerConfig {
    /// `max_retries` given to steps added without an explicit limit.
    pub default_max_retries: u32,

    /// Per-attempt wall-clock limit in seconds. Unset means no limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_timeout_secs: Option<u64>,

    /// Stop a run after this many steps reach a terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps_per_run: Option<u32>,

    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay before the first retry; doubles per failure. `0` retries immediately.
    pub backoff_base_ms: u64,

    /// Upper bound for the retry delay.
    pub backoff_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_base_ms: 0,
            backoff_max_ms: 30_000,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_max_retries: DEFAULT_MAX_RETRIES,
            action_timeout_secs: None,
            max_steps_per_run: None,
            retry: RetryConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_max_retries == 0 {
            return Err(anyhow!("default_max_retries must be > 0"));
        }
        if self.action_timeout_secs == Some(0) {
            return Err(anyhow!("action_timeout_secs must be > 0 when set"));
        }
        if self.max_steps_per_run == Some(0) {
            return Err(anyhow!("max_steps_per_run must be > 0 when set"));
        }
        if self.retry.backoff_max_ms < self.retry.backoff_base_ms {
            return Err(anyhow!(
                "retry.backoff_max_ms must be >= retry.backoff_base_ms"
            ));
        }
        Ok(())
    }

    /// Options for a single [`run`](crate::tracker::run) derived from this config.
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            backoff_base: Duration::from_millis(self.retry.backoff_base_ms),
            backoff_max: Duration::from_millis(self.retry.backoff_max_ms),
            action_timeout: self.action_timeout_secs.map(Duration::from_secs),
            max_steps: self.max_steps_per_run,
        }
    }
}

/// In-memory options for one run of the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub action_timeout: Option<Duration>,
    pub max_steps: Option<u32>,
}

impl Default for RunConfig {
    fn default() -> Self {
        TrackerConfig::default().run_config()
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `TrackerConfig::default()`.
pub fn load_config(path: &Path) -> Result<TrackerConfig> {
    if !path.exists() {
        let cfg = TrackerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: TrackerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &TrackerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
