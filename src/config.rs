//! Agent configuration
//!
//! Settings are layered: built-in defaults, then an optional JSON file, then
//! `SYS_HEALTH_*` environment variables, then command line flags (applied by
//! the binary). Every layer may set any option independently.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    HealthError, HealthResult,
    actors::scheduler::{DEFAULT_INTERVAL, DEFAULT_SOURCE_TIMEOUT, Timing},
    monitors::thresholds::{
        DEFAULT_CPU_THRESHOLD, DEFAULT_DISK_IO_THRESHOLD, DEFAULT_DISK_SPACE_THRESHOLD_PERCENT,
        DEFAULT_MEMORY_THRESHOLD_PERCENT, Thresholds,
    },
    sources::SourceKind,
    util::{env_key, get_default_bind_addr, parse_env_value},
};

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Memory used above this percentage raises an alert
    pub memory_threshold_percent: f64,

    /// CPU busy limit, in percent (values above 100 disable CPU alerts)
    pub cpu_threshold: f64,

    /// Pages paged in or out per interval above this raise an alert
    pub disk_io_threshold: u64,

    /// Used space of `filesystem_mount` above this percentage raises an alert
    pub disk_space_threshold_percent: f64,

    /// Mount point whose space is watched; `None` turns the check off
    pub filesystem_mount: Option<PathBuf>,

    /// Time between two samples
    pub sample_interval_ms: u64,

    /// Upper bound for a single source read
    pub source_timeout_ms: u64,

    /// Address of the read endpoint
    pub bind_addr: SocketAddr,

    /// Bearer token required by the read endpoint (optional)
    pub auth_token: Option<String>,

    pub source: SourceKind,

    /// Mount point of procfs (only used by the procfs source)
    pub procfs_root: PathBuf,

    /// Webhook receiving alerts as JSON (optional)
    pub alert_webhook: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            memory_threshold_percent: DEFAULT_MEMORY_THRESHOLD_PERCENT,
            cpu_threshold: DEFAULT_CPU_THRESHOLD,
            disk_io_threshold: DEFAULT_DISK_IO_THRESHOLD,
            disk_space_threshold_percent: DEFAULT_DISK_SPACE_THRESHOLD_PERCENT,
            filesystem_mount: Some(PathBuf::from("/")),
            sample_interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            source_timeout_ms: DEFAULT_SOURCE_TIMEOUT.as_millis() as u64,
            bind_addr: get_default_bind_addr(),
            auth_token: None,
            source: SourceKind::default(),
            procfs_root: PathBuf::from("/proc"),
            alert_webhook: None,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("memory_threshold_percent", &self.memory_threshold_percent)
            .field("cpu_threshold", &self.cpu_threshold)
            .field("disk_io_threshold", &self.disk_io_threshold)
            .field(
                "disk_space_threshold_percent",
                &self.disk_space_threshold_percent,
            )
            .field("filesystem_mount", &self.filesystem_mount)
            .field("sample_interval_ms", &self.sample_interval_ms)
            .field("source_timeout_ms", &self.source_timeout_ms)
            .field("bind_addr", &self.bind_addr)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("source", &self.source)
            .field("procfs_root", &self.procfs_root)
            .field("alert_webhook", &self.alert_webhook)
            .finish()
    }
}

impl Settings {
    /// Defaults, overlaid with the config file (if given) and the environment.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = match file {
            Some(path) => read_config_file(path)?,
            None => Settings::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Overlay values found through `lookup` (normally the process environment).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            let key = env_key(name);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((key, value)) = get("MEM_THRESHOLD") {
            if let Some(v) = parse_env_value(&key, &value) {
                self.memory_threshold_percent = v;
            }
        }
        if let Some((key, value)) = get("CPU_THRESHOLD") {
            if let Some(v) = parse_env_value(&key, &value) {
                self.cpu_threshold = v;
            }
        }
        if let Some((key, value)) = get("DISK_IO_THRESHOLD") {
            if let Some(v) = parse_env_value(&key, &value) {
                self.disk_io_threshold = v;
            }
        }
        if let Some((key, value)) = get("DISK_SPACE_THRESHOLD") {
            if let Some(v) = parse_env_value(&key, &value) {
                self.disk_space_threshold_percent = v;
            }
        }
        if let Some((_, value)) = get("FS_MOUNT") {
            self.filesystem_mount = Some(value)
                .filter(|mount| !mount.is_empty())
                .map(PathBuf::from);
        }
        if let Some((key, value)) = get("INTERVAL_MS") {
            if let Some(v) = parse_env_value(&key, &value) {
                self.sample_interval_ms = v;
            }
        }
        if let Some((key, value)) = get("SOURCE_TIMEOUT_MS") {
            if let Some(v) = parse_env_value(&key, &value) {
                self.source_timeout_ms = v;
            }
        }
        if let Some((key, value)) = get("ADDR") {
            if let Some(v) = parse_env_value(&key, &value) {
                self.bind_addr = v;
            }
        }
        if let Some((_, value)) = get("TOKEN") {
            self.auth_token = Some(value).filter(|token| !token.is_empty());
        }
        if let Some((key, value)) = get("SOURCE") {
            match SourceKind::from_str(&value, true) {
                Ok(kind) => self.source = kind,
                Err(_) => tracing::warn!("ignoring invalid value '{value}' for {key}"),
            }
        }
        if let Some((_, value)) = get("PROCFS_ROOT") {
            self.procfs_root = PathBuf::from(value);
        }
        if let Some((_, value)) = get("WEBHOOK") {
            self.alert_webhook = Some(value).filter(|url| !url.is_empty());
        }
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> HealthResult<()> {
        self.thresholds().validate()?;
        validate_interval(self.interval())?;
        if self.source_timeout_ms == 0 {
            return Err(HealthError::config_invalid(
                "source_timeout_ms",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            memory_percent: self.memory_threshold_percent,
            cpu: self.cpu_threshold,
            disk_io: self.disk_io_threshold,
            disk_space_percent: self.disk_space_threshold_percent,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn timing(&self) -> Timing {
        Timing {
            interval: self.interval(),
            source_timeout: Duration::from_millis(self.source_timeout_ms),
        }
    }
}

pub fn validate_interval(interval: Duration) -> HealthResult<Duration> {
    if interval.is_zero() {
        return Err(HealthError::config_invalid(
            "sample_interval_ms",
            "must be greater than zero",
        ));
    }
    Ok(interval)
}

pub fn read_config_file(path: &Path) -> anyhow::Result<Settings> {
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|settings| trace!("loaded config: {settings:?}"))
}
