//! Agent lifecycle
//!
//! Startup order: validate settings, register the read endpoint, build the
//! source and alert sink, then arm the scheduler. Shutdown runs the other
//! way round: the scheduler is stopped (waiting for an in-flight tick) before
//! the endpoint is torn down.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    HealthResult,
    actors::scheduler::SchedulerHandle,
    alerts::build_sink,
    api::{self, ApiConfig, ApiServer, ApiState},
    config::Settings,
    monitors::thresholds::ThresholdHandle,
    sources::build_source,
    store::StatsStore,
};

pub struct Agent;

impl Agent {
    /// Start every component.
    ///
    /// Fails with `ConfigInvalid` for out-of-range settings and with
    /// `RegistrationFailed` when the endpoint cannot be bound. Nothing keeps
    /// running when this returns an error.
    #[instrument(skip_all, fields(addr = %settings.bind_addr))]
    pub async fn start(settings: Settings) -> HealthResult<RunningAgent> {
        settings.validate()?;

        let thresholds = ThresholdHandle::new(settings.thresholds())?;
        let store = StatsStore::new();

        let listener = api::bind(settings.bind_addr).await?;

        let source = build_source(
            settings.source,
            &settings.procfs_root,
            settings.filesystem_mount.as_deref(),
        );
        let sink = build_sink(settings.alert_webhook.as_deref());
        let scheduler = SchedulerHandle::spawn(
            source,
            store.clone(),
            thresholds.clone(),
            sink,
            settings.timing(),
        )?;

        let config = ApiConfig {
            bind_addr: settings.bind_addr,
            auth_token: settings.auth_token.clone(),
        };
        let state = ApiState::new(Arc::new(store.clone()), thresholds.clone(), scheduler.clone());
        let server = match api::spawn_api_server(listener, &config, state) {
            Ok(server) => server,
            Err(e) => {
                scheduler.stop().await;
                return Err(e);
            }
        };

        info!(
            "sys-health agent running on {} (interval {:?})",
            server.addr(),
            settings.interval()
        );

        Ok(RunningAgent {
            store,
            thresholds,
            scheduler,
            server,
        })
    }
}

/// Handles of a started agent
pub struct RunningAgent {
    store: StatsStore,
    thresholds: ThresholdHandle,
    scheduler: SchedulerHandle,
    server: ApiServer,
}

impl RunningAgent {
    /// Address of the read endpoint
    pub fn addr(&self) -> SocketAddr {
        self.server.addr()
    }

    pub fn store(&self) -> &StatsStore {
        &self.store
    }

    pub fn thresholds(&self) -> &ThresholdHandle {
        &self.thresholds
    }

    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    /// Stop the scheduler, then the endpoint.
    pub async fn shutdown(self) {
        info!("shutting down");
        self.scheduler.stop().await;
        self.server.shutdown().await;
    }
}
