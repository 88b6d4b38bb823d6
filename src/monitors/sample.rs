//! Turns raw counters into derived values.
//!
//! CPU usage and paging rates only make sense as the difference between two
//! consecutive readings, so the caller passes in the counters of the previous
//! successful tick. On the very first tick there is no baseline: CPU busy is
//! reported as unavailable and paging deltas are zero.

use crate::{CpuTimes, DerivedSample, FilesystemUsage, MemoryGauges, RawCounters};

const KIB_PER_MB: u64 = 1024;

/// Derive a sample from the current counters and the previous ones (if any).
pub fn compute(curr: &RawCounters, prev: Option<&RawCounters>) -> DerivedSample {
    let (cpu_busy_percent, pages_in_delta, pages_out_delta) = match prev {
        Some(prev) => (
            cpu_busy_percent(&curr.cpu, &prev.cpu),
            counter_delta(curr.io.pages_in, prev.io.pages_in),
            counter_delta(curr.io.pages_out, prev.io.pages_out),
        ),
        None => (None, 0, 0),
    };

    DerivedSample {
        memory_total_mb: curr.memory.total_kib / KIB_PER_MB,
        memory_free_mb: curr.memory.free_kib / KIB_PER_MB,
        memory_used_percent: memory_used_percent(&curr.memory),
        memory_available_mb: curr.memory.available_kib.map(|kib| kib / KIB_PER_MB),
        memory_buffers_mb: curr.memory.buffers_kib / KIB_PER_MB,
        memory_cached_mb: curr.memory.cached_kib / KIB_PER_MB,
        cpu_busy_percent,
        pages_in_delta,
        pages_out_delta,
        load: curr.load,
        disk_used_percent: curr.filesystem.as_ref().and_then(disk_used_percent),
    }
}

/// Busy share of the CPU time elapsed between two readings.
///
/// Returns `None` if no time elapsed (or the counters went backwards).
pub fn cpu_busy_percent(curr: &CpuTimes, prev: &CpuTimes) -> Option<f64> {
    let total_delta = counter_delta(curr.total, prev.total);
    if total_delta == 0 {
        return None;
    }

    let idle_delta = counter_delta(curr.idle, prev.idle).min(total_delta);
    let busy = 100.0 * (total_delta - idle_delta) as f64 / total_delta as f64;

    Some(busy.clamp(0.0, 100.0))
}

/// Percentage of memory in use.
///
/// Prefers the source's "available" estimate; without one, buffers and page
/// cache are treated as reclaimable and subtracted along with free memory.
pub fn memory_used_percent(memory: &MemoryGauges) -> f64 {
    if memory.total_kib == 0 {
        return 0.0;
    }

    let unused = match memory.available_kib {
        Some(available) => available,
        None => memory
            .free_kib
            .saturating_add(memory.buffers_kib)
            .saturating_add(memory.cached_kib),
    };
    let used = memory.total_kib.saturating_sub(unused);

    (100.0 * used as f64 / memory.total_kib as f64).clamp(0.0, 100.0)
}

/// Used share of a filesystem; `None` for an empty (or unknown) capacity.
pub fn disk_used_percent(fs: &FilesystemUsage) -> Option<f64> {
    if fs.total_kib == 0 {
        return None;
    }
    let used = fs.total_kib.saturating_sub(fs.available_kib);
    Some((100.0 * used as f64 / fs.total_kib as f64).clamp(0.0, 100.0))
}

/// Difference of a monotonic counter; a reset or wrap clamps to zero.
pub fn counter_delta(curr: u64, prev: u64) -> u64 {
    curr.saturating_sub(prev)
}
