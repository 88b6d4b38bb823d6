//! Test helpers: a fake procfs tree and an alert recorder

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sys_health::{
    actors::scheduler::{SchedulerHandle, Timing},
    alerts::AlertSink,
    monitors::thresholds::{AlertEvent, ThresholdHandle},
    sources::ProcfsSource,
    store::StatsStore,
};
use tempfile::TempDir;

/// Values written into the fake procfs files
#[derive(Debug, Clone, Copy)]
pub struct Reading {
    pub busy: u64,
    pub idle: u64,
    pub total_kib: u64,
    pub free_kib: u64,
    pub available_kib: Option<u64>,
    pub pages_in: u64,
    pub pages_out: u64,
}

impl Default for Reading {
    fn default() -> Self {
        Self {
            busy: 1_000,
            idle: 9_000,
            total_kib: 4 * 1024 * 1024,
            free_kib: 3 * 1024 * 1024,
            available_kib: None,
            pages_in: 100,
            pages_out: 100,
        }
    }
}

/// A temporary directory laid out like `/proc`
pub struct FakeProcfs {
    dir: TempDir,
}

impl FakeProcfs {
    pub fn new(reading: Reading) -> Self {
        let procfs = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        procfs.set(reading);
        procfs
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn set(&self, r: Reading) {
        // user nice system idle iowait irq softirq steal
        std::fs::write(
            self.path().join("stat"),
            format!(
                "cpu  {} 0 0 {} 0 0 0 0 0 0\ncpu0 {} 0 0 {} 0 0 0 0 0 0\nintr 0\n",
                r.busy, r.idle, r.busy, r.idle
            ),
        )
        .unwrap();

        let mut meminfo = format!(
            "MemTotal:       {} kB\nMemFree:        {} kB\n",
            r.total_kib, r.free_kib
        );
        if let Some(available) = r.available_kib {
            meminfo.push_str(&format!("MemAvailable:   {available} kB\n"));
        }
        meminfo.push_str("Buffers:        0 kB\nCached:         0 kB\n");
        std::fs::write(self.path().join("meminfo"), meminfo).unwrap();

        std::fs::write(
            self.path().join("vmstat"),
            format!("nr_free_pages 1\npgpgin {}\npgpgout {}\n", r.pages_in, r.pages_out),
        )
        .unwrap();

        std::fs::write(self.path().join("loadavg"), "0.52 0.40 0.10 1/123 4567\n").unwrap();
    }

    pub fn break_stat(&self) {
        self.write_stat("garbage\n");
    }

    pub fn write_stat(&self, content: &str) {
        std::fs::write(self.path().join("stat"), content).unwrap();
    }
}

/// Alert sink that keeps every published alert
#[derive(Default)]
pub struct RecordingSink {
    alerts: Mutex<Vec<AlertEvent>>,
}

impl RecordingSink {
    pub fn alerts(&self) -> Vec<AlertEvent> {
        self.alerts.lock().unwrap().clone()
    }
}

impl AlertSink for RecordingSink {
    fn publish(&self, alerts: &[AlertEvent]) {
        self.alerts.lock().unwrap().extend_from_slice(alerts);
    }
}

pub struct Pipeline {
    pub scheduler: SchedulerHandle,
    pub store: StatsStore,
    pub thresholds: ThresholdHandle,
    pub sink: Arc<RecordingSink>,
}

/// Scheduler over a fake procfs that only ticks on demand
pub fn manual_pipeline(procfs: &FakeProcfs) -> Pipeline {
    pipeline(procfs, Duration::from_secs(3600))
}

pub fn pipeline(procfs: &FakeProcfs, interval: Duration) -> Pipeline {
    let store = StatsStore::new();
    let thresholds = ThresholdHandle::default();
    let sink = Arc::new(RecordingSink::default());

    let scheduler = SchedulerHandle::spawn(
        Box::new(ProcfsSource::new(procfs.path())),
        store.clone(),
        thresholds.clone(),
        sink.clone(),
        Timing {
            interval,
            source_timeout: Duration::from_secs(2),
        },
    )
    .unwrap();

    Pipeline {
        scheduler,
        store,
        thresholds,
        sink,
    }
}
