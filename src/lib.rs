pub mod actors;
#[cfg(feature = "api")]
pub mod agent;
pub mod alerts;
pub mod api;
pub mod config;
pub mod error;
pub mod monitors;
pub mod report;
pub mod sources;
pub mod store;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use error::{HealthError, HealthResult};
pub use monitors::thresholds::Thresholds;

/// Counters captured from a metric source during a single tick.
///
/// Cumulative fields (`cpu`, `io`) only grow within a boot, while `memory`
/// and `load` are instantaneous gauges.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawCounters {
    pub cpu: CpuTimes,
    pub memory: MemoryGauges,
    pub io: PageCounters,
    pub load: Option<LoadAverage>,
    /// Space of the monitored filesystem, if one is configured
    pub filesystem: Option<FilesystemUsage>,
}

/// Aggregate CPU time in jiffies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CpuTimes {
    /// Sum of all accounted states
    pub total: u64,
    /// Idle plus iowait
    pub idle: u64,
}

/// Memory gauges in KiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryGauges {
    pub total_kib: u64,
    pub free_kib: u64,
    /// Estimate of reclaimable-aware free memory, if the source supplies one
    pub available_kib: Option<u64>,
    pub buffers_kib: u64,
    pub cached_kib: u64,
}

/// Cumulative paging counters (1 KiB pages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageCounters {
    pub pages_in: u64,
    pub pages_out: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Capacity of a mounted filesystem in KiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilesystemUsage {
    pub total_kib: u64,
    pub available_kib: u64,
}

/// Human-meaningful values derived from the current and previous counters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedSample {
    pub memory_total_mb: u64,
    pub memory_free_mb: u64,
    pub memory_used_percent: f64,
    /// Only set when the source reports an "available" estimate
    pub memory_available_mb: Option<u64>,
    pub memory_buffers_mb: u64,
    pub memory_cached_mb: u64,
    /// `None` while no delta is available (first tick or no elapsed ticks)
    pub cpu_busy_percent: Option<f64>,
    pub pages_in_delta: u64,
    pub pages_out_delta: u64,
    pub load: Option<LoadAverage>,
    /// Used share of the monitored filesystem
    pub disk_used_percent: Option<f64>,
}

/// The externally visible record: latest sample plus the thresholds that
/// were active when it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub sample: DerivedSample,
    pub thresholds: Thresholds,
    pub taken_at: DateTime<Utc>,
    /// Sequence number of the successful tick that produced this snapshot
    pub tick: u64,
}
