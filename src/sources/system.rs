//! Portable source backed by `sysinfo`.
//!
//! `sysinfo` reports CPU usage as a percentage since its previous refresh
//! rather than as cumulative jiffies. To keep the [`RawCounters`] contract
//! (monotonic CPU counters) this source integrates that percentage over the
//! elapsed wall-clock milliseconds, so the delta between two samples yields
//! the same busy share `sysinfo` measured.
//!
//! Refreshing blocks on platform calls, so every sample runs on the blocking
//! pool through [`run_blocking`].

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use sysinfo::{Disks, System};
use tracing::trace;

use crate::{
    CpuTimes, HealthError, HealthResult, LoadAverage, MemoryGauges, PageCounters, RawCounters,
};

use super::{MetricSource, filesystem::filesystem_usage, run_blocking};

const SOURCE_NAME: &str = "sysinfo";
const BYTES_PER_KIB: u64 = 1024;

struct SysinfoState {
    system: System,
    disks: Disks,
    cpu: CpuTimes,
    last_refresh: Option<Instant>,
    filesystem: Option<PathBuf>,
}

impl SysinfoState {
    fn advance_cpu(&mut self, usage_percent: f32) {
        let now = Instant::now();
        if let Some(last) = self.last_refresh {
            let elapsed = now.duration_since(last).as_millis() as u64;
            let busy_fraction = f64::from(usage_percent.clamp(0.0, 100.0)) / 100.0;
            let busy = (elapsed as f64 * busy_fraction).round() as u64;

            self.cpu.total = self.cpu.total.saturating_add(elapsed);
            self.cpu.idle = self.cpu.idle.saturating_add(elapsed.saturating_sub(busy));
        }
        self.last_refresh = Some(now);
    }

    fn sample(&mut self) -> HealthResult<RawCounters> {
        self.system.refresh_memory();
        self.system.refresh_cpu_usage();
        self.disks.refresh(true);

        let total = self.system.total_memory();
        if total == 0 {
            return Err(HealthError::source_unavailable(
                SOURCE_NAME,
                "platform reported no memory",
            ));
        }

        let usage = self.system.global_cpu_usage();
        self.advance_cpu(usage);
        trace!("sysinfo cpu usage {usage}% -> {:?}", self.cpu);

        let (read_bytes, written_bytes) = self.disks.iter().fold((0u64, 0u64), |(r, w), disk| {
            let usage = disk.usage();
            (
                r.saturating_add(usage.total_read_bytes),
                w.saturating_add(usage.total_written_bytes),
            )
        });

        let filesystem = self
            .filesystem
            .as_deref()
            .and_then(|mount| filesystem_usage(&self.disks, mount));

        let load = System::load_average();

        Ok(RawCounters {
            cpu: self.cpu,
            memory: MemoryGauges {
                total_kib: total / BYTES_PER_KIB,
                free_kib: self.system.free_memory() / BYTES_PER_KIB,
                available_kib: Some(self.system.available_memory() / BYTES_PER_KIB),
                buffers_kib: 0,
                cached_kib: 0,
            },
            io: PageCounters {
                pages_in: read_bytes / BYTES_PER_KIB,
                pages_out: written_bytes / BYTES_PER_KIB,
            },
            load: Some(LoadAverage {
                one: load.one,
                five: load.five,
                fifteen: load.fifteen,
            }),
            filesystem,
        })
    }
}

pub struct SysinfoSource {
    state: Arc<Mutex<SysinfoState>>,
}

impl SysinfoSource {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SysinfoState {
                system: System::new(),
                disks: Disks::new_with_refreshed_list(),
                cpu: CpuTimes::default(),
                last_refresh: None,
                filesystem: None,
            })),
        }
    }

    /// Also report the space of the filesystem holding `mount`.
    pub fn with_filesystem(self, mount: Option<PathBuf>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.filesystem = mount;
        }
        self
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricSource for SysinfoSource {
    async fn sample(&mut self) -> HealthResult<RawCounters> {
        let state = Arc::clone(&self.state);
        run_blocking(SOURCE_NAME, move || {
            let mut state = state.lock().map_err(|_| {
                HealthError::source_unavailable(SOURCE_NAME, "previous read panicked")
            })?;
            state.sample()
        })
        .await
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}
