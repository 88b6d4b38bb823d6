//! Threshold configuration and evaluation.
//!
//! Evaluation is a single comparison per metric and sample: a metric whose
//! derived value is strictly greater than its limit produces one
//! [`AlertEvent`]. There is no grace period or escalation state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::{DerivedSample, HealthError, HealthResult};

pub const DEFAULT_MEMORY_THRESHOLD_PERCENT: f64 = 80.0;
pub const DEFAULT_CPU_THRESHOLD: f64 = 150.0;
pub const DEFAULT_DISK_IO_THRESHOLD: u64 = 1000;
pub const DEFAULT_DISK_SPACE_THRESHOLD_PERCENT: f64 = 90.0;

/// Limits every sample is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Memory used, in percent (0..=100)
    pub memory_percent: f64,

    /// CPU busy limit, in percent. Values above 100 never fire, so the
    /// default of 150 leaves CPU alerts off.
    pub cpu: f64,

    /// Pages paged in or out per interval
    pub disk_io: u64,

    /// Used space of the monitored filesystem, in percent (0..=100)
    #[serde(default = "default_disk_space_percent")]
    pub disk_space_percent: f64,
}

fn default_disk_space_percent() -> f64 {
    DEFAULT_DISK_SPACE_THRESHOLD_PERCENT
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            memory_percent: DEFAULT_MEMORY_THRESHOLD_PERCENT,
            cpu: DEFAULT_CPU_THRESHOLD,
            disk_io: DEFAULT_DISK_IO_THRESHOLD,
            disk_space_percent: DEFAULT_DISK_SPACE_THRESHOLD_PERCENT,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> HealthResult<()> {
        validate_memory_percent(self.memory_percent)?;
        validate_cpu(self.cpu)?;
        validate_disk_space_percent(self.disk_space_percent)?;
        Ok(())
    }
}

pub fn validate_memory_percent(value: f64) -> HealthResult<f64> {
    validate_percent("memory_threshold_percent", value)
}

pub fn validate_disk_space_percent(value: f64) -> HealthResult<f64> {
    validate_percent("disk_space_threshold_percent", value)
}

fn validate_percent(field: &str, value: f64) -> HealthResult<f64> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(HealthError::config_invalid(
            field,
            format!("{value} is not within 0..=100"),
        ));
    }
    Ok(value)
}

pub fn validate_cpu(value: f64) -> HealthResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(HealthError::config_invalid(
            "cpu_threshold",
            format!("{value} must be a non-negative number"),
        ));
    }
    Ok(value)
}

/// Partial update of the thresholds; absent fields keep their value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdUpdate {
    pub memory_percent: Option<f64>,
    pub cpu: Option<f64>,
    pub disk_io: Option<u64>,
    pub disk_space_percent: Option<f64>,
}

/// Shared, runtime-adjustable thresholds.
///
/// Every option is replaced as a whole value under the lock, so readers see
/// either the old or the new limit.
#[derive(Debug, Clone, Default)]
pub struct ThresholdHandle {
    inner: Arc<RwLock<Thresholds>>,
}

impl ThresholdHandle {
    pub fn new(thresholds: Thresholds) -> HealthResult<Self> {
        thresholds.validate()?;
        Ok(Self {
            inner: Arc::new(RwLock::new(thresholds)),
        })
    }

    /// Copy of the currently active thresholds
    pub async fn current(&self) -> Thresholds {
        *self.inner.read().await
    }

    pub async fn set_memory_percent(&self, value: f64) -> HealthResult<()> {
        let value = validate_memory_percent(value)?;
        self.inner.write().await.memory_percent = value;
        debug!("memory threshold set to {value}%");
        Ok(())
    }

    pub async fn set_cpu(&self, value: f64) -> HealthResult<()> {
        let value = validate_cpu(value)?;
        self.inner.write().await.cpu = value;
        debug!("cpu threshold set to {value}");
        Ok(())
    }

    pub async fn set_disk_io(&self, value: u64) {
        self.inner.write().await.disk_io = value;
        debug!("disk I/O threshold set to {value} pages");
    }

    pub async fn set_disk_space_percent(&self, value: f64) -> HealthResult<()> {
        let value = validate_disk_space_percent(value)?;
        self.inner.write().await.disk_space_percent = value;
        debug!("disk space threshold set to {value}%");
        Ok(())
    }

    /// Apply a partial update.
    ///
    /// All supplied values are validated before any of them is written, so an
    /// invalid field leaves every threshold untouched.
    pub async fn apply(&self, update: ThresholdUpdate) -> HealthResult<Thresholds> {
        if let Some(value) = update.memory_percent {
            validate_memory_percent(value)?;
        }
        if let Some(value) = update.cpu {
            validate_cpu(value)?;
        }
        if let Some(value) = update.disk_space_percent {
            validate_disk_space_percent(value)?;
        }

        let mut thresholds = self.inner.write().await;
        if let Some(value) = update.memory_percent {
            thresholds.memory_percent = value;
        }
        if let Some(value) = update.cpu {
            thresholds.cpu = value;
        }
        if let Some(value) = update.disk_io {
            thresholds.disk_io = value;
        }
        if let Some(value) = update.disk_space_percent {
            thresholds.disk_space_percent = value;
        }
        debug!("thresholds updated: {:?}", *thresholds);

        Ok(*thresholds)
    }
}

/// The metric an alert refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertMetric {
    Memory,
    Cpu,
    DiskIoIn,
    DiskIoOut,
    DiskSpace,
}

impl AlertMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertMetric::Memory => "memory_used_percent",
            AlertMetric::Cpu => "cpu_busy",
            AlertMetric::DiskIoIn => "pages_in",
            AlertMetric::DiskIoOut => "pages_out",
            AlertMetric::DiskSpace => "disk_space_used_percent",
        }
    }
}

impl std::fmt::Display for AlertMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single threshold exceedance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub metric: AlertMetric,
    pub observed: f64,
    pub threshold: f64,
    pub timestamp: DateTime<Utc>,
}

impl std::fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.metric {
            AlertMetric::Memory => write!(
                f,
                "memory usage {:.2}% exceeds threshold {:.2}%",
                self.observed, self.threshold
            ),
            AlertMetric::Cpu => write!(
                f,
                "CPU busy {:.2} exceeds threshold {:.2}",
                self.observed, self.threshold
            ),
            AlertMetric::DiskIoIn => write!(
                f,
                "{} pages paged in exceeds threshold of {} pages",
                self.observed, self.threshold
            ),
            AlertMetric::DiskIoOut => write!(
                f,
                "{} pages paged out exceeds threshold of {} pages",
                self.observed, self.threshold
            ),
            AlertMetric::DiskSpace => write!(
                f,
                "disk usage {:.2}% exceeds threshold {:.2}%",
                self.observed, self.threshold
            ),
        }
    }
}

/// Compare a sample against the thresholds.
///
/// Output order is fixed: memory, CPU, pages in, pages out, disk space. An
/// unavailable CPU or disk space reading never alerts.
pub fn evaluate(
    sample: &DerivedSample,
    thresholds: &Thresholds,
    at: DateTime<Utc>,
) -> Vec<AlertEvent> {
    let mut alerts = Vec::new();

    let mut check = |metric: AlertMetric, observed: f64, threshold: f64| {
        let exceeded = observed > threshold;
        trace!("{metric}: {observed} (max: {threshold}) -> exceeded: {exceeded}");
        if exceeded {
            alerts.push(AlertEvent {
                metric,
                observed,
                threshold,
                timestamp: at,
            });
        }
    };

    check(
        AlertMetric::Memory,
        sample.memory_used_percent,
        thresholds.memory_percent,
    );

    if let Some(busy) = sample.cpu_busy_percent {
        check(AlertMetric::Cpu, busy, thresholds.cpu);
    }

    let io_limit = thresholds.disk_io as f64;
    check(AlertMetric::DiskIoIn, sample.pages_in_delta as f64, io_limit);
    check(AlertMetric::DiskIoOut, sample.pages_out_delta as f64, io_limit);

    if let Some(used) = sample.disk_used_percent {
        check(AlertMetric::DiskSpace, used, thresholds.disk_space_percent);
    }

    alerts
}
