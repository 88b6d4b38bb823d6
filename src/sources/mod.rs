//! Metric sources
//!
//! A source pulls raw counters from the environment once per tick. Two
//! implementations exist:
//!
//! - [`procfs::ProcfsSource`] reads `/proc/stat`, `/proc/meminfo`,
//!   `/proc/vmstat` and `/proc/loadavg` directly (Linux)
//! - [`system::SysinfoSource`] goes through the `sysinfo` crate and works on
//!   any platform it supports
//!
//! Both may also report the space of one mounted filesystem
//! ([`filesystem`]).

pub mod filesystem;
pub mod procfs;
pub mod system;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{HealthError, HealthResult, RawCounters};

pub use procfs::ProcfsSource;
pub use system::SysinfoSource;

/// Something that can produce raw counters on demand.
///
/// Implementations must fail with [`crate::HealthError::SourceUnavailable`]
/// instead of returning partially filled counters.
#[async_trait]
pub trait MetricSource: Send {
    /// Capture the current counters
    async fn sample(&mut self) -> HealthResult<RawCounters>;

    /// Short name used in logs and errors
    fn name(&self) -> &str;
}

/// Run synchronous source work on the blocking pool.
///
/// The returned future can be dropped (for example by a timeout) without
/// stalling the runtime; the closure then finishes on its own thread.
pub async fn run_blocking<T, F>(source_name: &'static str, f: F) -> HealthResult<T>
where
    F: FnOnce() -> HealthResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| HealthError::source_unavailable(source_name, format!("read aborted: {e}")))?
}

/// Which source implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// procfs when available, sysinfo otherwise
    #[default]
    Auto,
    Procfs,
    Sysinfo,
}

/// Build the configured source, watching the space of `filesystem` if set.
pub fn build_source(
    kind: SourceKind,
    procfs_root: &Path,
    filesystem: Option<&Path>,
) -> Box<dyn MetricSource> {
    let kind = match kind {
        SourceKind::Auto if procfs_root.join("stat").exists() => SourceKind::Procfs,
        SourceKind::Auto => SourceKind::Sysinfo,
        other => other,
    };

    debug!("using {kind:?} metric source");

    match kind {
        SourceKind::Procfs | SourceKind::Auto => Box::new(
            ProcfsSource::new(PathBuf::from(procfs_root))
                .with_filesystem(filesystem.map(PathBuf::from)),
        ),
        SourceKind::Sysinfo => {
            Box::new(SysinfoSource::new().with_filesystem(filesystem.map(PathBuf::from)))
        }
    }
}
