use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use sys_health::{agent::Agent, config::Settings, sources::SourceKind};
use tracing::{debug, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

/// Periodic system health sampler with threshold alerts
#[derive(Debug, Clone, Parser)]
#[command(name = "sys-health", version)]
struct Args {
    /// Config file (JSON)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Memory used percentage that raises an alert
    #[arg(long)]
    mem_threshold: Option<f64>,

    /// CPU busy percentage that raises an alert (above 100 disables it)
    #[arg(long)]
    cpu_threshold: Option<f64>,

    /// Pages paged in or out per interval that raise an alert
    #[arg(long)]
    disk_io_threshold: Option<u64>,

    /// Used disk space percentage of the watched filesystem that raises an alert
    #[arg(long)]
    disk_space_threshold: Option<f64>,

    /// Mount point whose space is watched
    #[arg(long)]
    fs_mount: Option<PathBuf>,

    /// Sampling interval in milliseconds
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Address of the read endpoint
    #[arg(short, long)]
    addr: Option<SocketAddr>,

    /// Bearer token required by the read endpoint
    #[arg(long)]
    token: Option<String>,

    /// Metric source
    #[arg(long, value_enum)]
    source: Option<SourceKind>,

    /// Webhook receiving alerts
    #[arg(long)]
    webhook: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Command line flags are the last settings layer
    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = self.mem_threshold {
            settings.memory_threshold_percent = v;
        }
        if let Some(v) = self.cpu_threshold {
            settings.cpu_threshold = v;
        }
        if let Some(v) = self.disk_io_threshold {
            settings.disk_io_threshold = v;
        }
        if let Some(v) = self.disk_space_threshold {
            settings.disk_space_threshold_percent = v;
        }
        if let Some(v) = &self.fs_mount {
            settings.filesystem_mount = Some(v.clone());
        }
        if let Some(v) = self.interval_ms {
            settings.sample_interval_ms = v;
        }
        if let Some(v) = self.addr {
            settings.bind_addr = v;
        }
        if let Some(v) = &self.token {
            settings.auth_token = Some(v.clone());
        }
        if let Some(v) = self.source {
            settings.source = v;
        }
        if let Some(v) = &self.webhook {
            settings.alert_webhook = Some(v.clone());
        }
    }
}

fn init(verbose: u8) {
    dotenv::dotenv().ok();

    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("sys_health", level),
        ("tower_http", LevelFilter::INFO),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init(args.verbose);
    trace!("started with verbosity {}", args.verbose);

    let mut settings = Settings::load(args.file.as_deref())?;
    args.apply(&mut settings);
    debug!("effective settings: {settings:?}");

    let agent = Agent::start(settings)
        .await
        .context("failed to start sys-health agent")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("received Ctrl-C");

    agent.shutdown().await;
    Ok(())
}
