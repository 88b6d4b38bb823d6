//! Fixed-format text report served by the read endpoint.

use std::fmt;

use crate::{Snapshot, monitors::thresholds::evaluate};

pub const NO_DATA: &str = "System Health\nno data yet: waiting for the first successful sample\n";

/// Report for a snapshot, or the "no data yet" report when the scheduler
/// has not stored anything so far.
pub struct Report<'a>(pub Option<&'a Snapshot>);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(snapshot) = self.0 else {
            return f.write_str(NO_DATA);
        };

        let sample = &snapshot.sample;
        let thresholds = &snapshot.thresholds;

        writeln!(
            f,
            "System Health (tick {}, {})",
            snapshot.tick,
            snapshot.taken_at.to_rfc3339()
        )?;
        writeln!(f, "Total RAM: {} MB", sample.memory_total_mb)?;
        writeln!(f, "Free RAM: {} MB", sample.memory_free_mb)?;
        if let Some(available) = sample.memory_available_mb {
            writeln!(f, "Available RAM: {available} MB")?;
        }
        writeln!(f, "Buffer RAM: {} MB", sample.memory_buffers_mb)?;
        writeln!(f, "Cached RAM: {} MB", sample.memory_cached_mb)?;
        writeln!(f, "Memory Used: {:.2}%", sample.memory_used_percent)?;

        match sample.cpu_busy_percent {
            Some(busy) => writeln!(f, "CPU Busy: {busy:.2}%")?,
            None => writeln!(f, "CPU Busy: unavailable")?,
        }

        match sample.load {
            Some(load) => writeln!(
                f,
                "CPU Load Averages: 1 min: {:.2}, 5 min: {:.2}, 15 min: {:.2}",
                load.one, load.five, load.fifteen
            )?,
            None => writeln!(f, "CPU Load Averages: unavailable")?,
        }

        writeln!(f, "Pages In (since last tick): {}", sample.pages_in_delta)?;
        writeln!(f, "Pages Out (since last tick): {}", sample.pages_out_delta)?;

        match sample.disk_used_percent {
            Some(used) => writeln!(f, "Disk Space Used: {used:.2}%")?,
            None => writeln!(f, "Disk Space Used: unavailable")?,
        }

        writeln!(
            f,
            "Thresholds: memory {:.2}%, cpu {:.2}, disk io {} pages, disk space {:.2}%",
            thresholds.memory_percent,
            thresholds.cpu,
            thresholds.disk_io,
            thresholds.disk_space_percent
        )?;

        for alert in evaluate(sample, thresholds, snapshot.taken_at) {
            writeln!(f, "ALERT: {alert}")?;
        }

        Ok(())
    }
}

/// Render the report to a string.
///
/// Pure function of its input, so repeated reads of the same snapshot give
/// identical output.
pub fn render(snapshot: Option<&Snapshot>) -> String {
    Report(snapshot).to_string()
}
