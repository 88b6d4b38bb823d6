//! Linux procfs source
//!
//! Formats, as produced by the kernel:
//!
//! ```text
//! /proc/stat     cpu  user nice system idle iowait irq softirq steal guest guest_nice
//! /proc/meminfo  MemTotal:       16314132 kB
//! /proc/vmstat   pgpgin 5125431
//! /proc/loadavg  0.52 0.58 0.59 2/1094 31424
//! ```
//!
//! Filesystem space is not part of procfs; it is read through `sysinfo`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sysinfo::Disks;
use tracing::trace;

use crate::{
    CpuTimes, FilesystemUsage, HealthError, HealthResult, LoadAverage, MemoryGauges,
    PageCounters, RawCounters,
};

use super::{MetricSource, filesystem::filesystem_usage, run_blocking};

const SOURCE_NAME: &str = "procfs";

/// Reads counters from a procfs mount (normally `/proc`).
#[derive(Debug, Clone)]
pub struct ProcfsSource {
    root: PathBuf,
    filesystem: Option<PathBuf>,
}

impl ProcfsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            filesystem: None,
        }
    }

    /// Also report the space of the filesystem holding `mount`.
    pub fn with_filesystem(mut self, mount: Option<PathBuf>) -> Self {
        self.filesystem = mount;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read(&self, file: &str) -> HealthResult<String> {
        let path = self.root.join(file);
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            HealthError::source_unavailable(
                SOURCE_NAME,
                format!("cannot read {}: {e}", path.display()),
            )
        })
    }

    async fn filesystem(&self) -> Option<FilesystemUsage> {
        let mount = self.filesystem.clone()?;
        let usage = run_blocking(SOURCE_NAME, move || {
            let disks = Disks::new_with_refreshed_list();
            filesystem_usage(&disks, &mount).ok_or_else(|| {
                HealthError::source_unavailable(
                    SOURCE_NAME,
                    format!("no filesystem mounted at {}", mount.display()),
                )
            })
        })
        .await;

        // filesystem space is informational, like load averages
        usage
            .inspect_err(|e| trace!("skipping filesystem space: {e}"))
            .ok()
    }
}

impl Default for ProcfsSource {
    fn default() -> Self {
        Self::new("/proc")
    }
}

#[async_trait]
impl MetricSource for ProcfsSource {
    async fn sample(&mut self) -> HealthResult<RawCounters> {
        let stat = self.read("stat").await?;
        let meminfo = self.read("meminfo").await?;
        let vmstat = self.read("vmstat").await?;

        let cpu = parse_cpu_times(&stat).map_err(unavailable)?;
        let memory = parse_meminfo(&meminfo).map_err(unavailable)?;
        let io = parse_vmstat(&vmstat).map_err(unavailable)?;

        // load averages are informational; a missing file is not a failure
        let load = match self.read("loadavg").await {
            Ok(content) => parse_loadavg(&content).ok(),
            Err(e) => {
                trace!("skipping load averages: {e}");
                None
            }
        };

        let filesystem = self.filesystem().await;

        Ok(RawCounters {
            cpu,
            memory,
            io,
            load,
            filesystem,
        })
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

fn unavailable(reason: String) -> HealthError {
    HealthError::source_unavailable(SOURCE_NAME, reason)
}

fn parse_number(field: &str, what: &str) -> Result<u64, String> {
    field
        .parse::<u64>()
        .map_err(|e| format!("invalid {what} value '{field}': {e}"))
}

/// Parse the aggregate `cpu` line of `/proc/stat`.
///
/// Kernels older than 2.6 only report the first four columns; missing
/// trailing columns count as zero.
pub fn parse_cpu_times(content: &str) -> Result<CpuTimes, String> {
    let line = content
        .lines()
        .find(|line| line.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| String::from("missing aggregate cpu line in stat"))?;

    let fields = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|field| parse_number(field, "cpu"))
        .collect::<Result<Vec<_>, _>>()?;

    if fields.len() < 4 {
        return Err(format!(
            "malformed cpu line: expected at least 4 fields, got {}",
            fields.len()
        ));
    }

    let overflow = || String::from("cpu counters overflow");
    let idle = fields[3]
        .checked_add(fields.get(4).copied().unwrap_or(0))
        .ok_or_else(overflow)?;
    let total = fields
        .iter()
        .try_fold(0u64, |sum, field| sum.checked_add(*field))
        .ok_or_else(overflow)?;

    Ok(CpuTimes { total, idle })
}

/// Parse the memory gauges of `/proc/meminfo` (values in kB).
pub fn parse_meminfo(content: &str) -> Result<MemoryGauges, String> {
    let mut total = None;
    let mut free = None;
    let mut available = None;
    let mut buffers = 0;
    let mut cached = 0;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(label), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };

        match label {
            "MemTotal:" => total = Some(parse_number(value, "MemTotal")?),
            "MemFree:" => free = Some(parse_number(value, "MemFree")?),
            "MemAvailable:" => available = Some(parse_number(value, "MemAvailable")?),
            "Buffers:" => buffers = parse_number(value, "Buffers")?,
            "Cached:" => cached = parse_number(value, "Cached")?,
            _ => {}
        }
    }

    Ok(MemoryGauges {
        total_kib: total.ok_or_else(|| String::from("missing MemTotal in meminfo"))?,
        free_kib: free.ok_or_else(|| String::from("missing MemFree in meminfo"))?,
        available_kib: available,
        buffers_kib: buffers,
        cached_kib: cached,
    })
}

/// Parse the paging counters of `/proc/vmstat`.
pub fn parse_vmstat(content: &str) -> Result<PageCounters, String> {
    let mut pages_in = None;
    let mut pages_out = None;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("pgpgin"), Some(value)) => pages_in = Some(parse_number(value, "pgpgin")?),
            (Some("pgpgout"), Some(value)) => pages_out = Some(parse_number(value, "pgpgout")?),
            _ => {}
        }
    }

    Ok(PageCounters {
        pages_in: pages_in.ok_or_else(|| String::from("missing pgpgin in vmstat"))?,
        pages_out: pages_out.ok_or_else(|| String::from("missing pgpgout in vmstat"))?,
    })
}

/// Parse the three load averages of `/proc/loadavg`.
pub fn parse_loadavg(content: &str) -> Result<LoadAverage, String> {
    let values = content
        .split_whitespace()
        .take(3)
        .map(|field| {
            field
                .parse::<f64>()
                .map_err(|e| format!("invalid load average '{field}': {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
        [one, five, fifteen] => Ok(LoadAverage {
            one: *one,
            five: *five,
            fifteen: *fifteen,
        }),
        _ => Err(String::from("malformed loadavg")),
    }
}
