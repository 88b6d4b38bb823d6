//! Alert delivery
//!
//! Delivery is fire-and-forget: sinks never report back to the scheduler,
//! there is no acknowledgement and no retry.

use std::sync::Arc;

use reqwest::Client;
use serde_json::json;
use sysinfo::System;
use tracing::{debug, error, info, instrument, warn};

use crate::monitors::thresholds::AlertEvent;

/// Receives the alerts produced by every tick.
pub trait AlertSink: Send + Sync {
    fn publish(&self, alerts: &[AlertEvent]);
}

/// Writes one warning line per alert to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn publish(&self, alerts: &[AlertEvent]) {
        for alert in alerts {
            warn!(
                metric = %alert.metric,
                observed = alert.observed,
                threshold = alert.threshold,
                "ALERT: {alert}"
            );
        }
    }
}

/// Posts every alert as JSON to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: Client,
    url: String,
    host: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            host: System::host_name().unwrap_or_else(|| String::from("unknown")),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Deliver a single alert and wait for the response.
    #[instrument(skip(self, alert), fields(metric = %alert.metric))]
    pub async fn send(&self, alert: &AlertEvent) {
        let payload = json!({
            "message": format!("⚠️ **System Health Alert** on `{}`: {alert}", self.host),
            "host": self.host,
            "metric": alert.metric,
            "observed": alert.observed,
            "threshold": alert.threshold,
            "timestamp": alert.timestamp.to_rfc3339(),
        });

        match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("Successfully sent webhook alert");
                } else {
                    error!("Webhook alert failed with status: {}", response.status());
                }
            }
            Err(e) => {
                error!("Failed to send webhook alert: {}", e);
            }
        }
    }
}

impl AlertSink for WebhookSink {
    fn publish(&self, alerts: &[AlertEvent]) {
        for alert in alerts.iter().copied() {
            let sink = self.clone();
            tokio::spawn(async move {
                sink.send(&alert).await;
            });
        }
    }
}

/// Forwards alerts to several sinks in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl AlertSink for FanoutSink {
    fn publish(&self, alerts: &[AlertEvent]) {
        if alerts.is_empty() {
            return;
        }
        debug!("publishing {} alerts to {} sinks", alerts.len(), self.sinks.len());
        for sink in &self.sinks {
            sink.publish(alerts);
        }
    }
}

/// Build the sink chain: always log, optionally post to a webhook.
pub fn build_sink(webhook: Option<&str>) -> Arc<dyn AlertSink> {
    let mut sink = FanoutSink::new().with(Arc::new(LogSink));
    if let Some(url) = webhook {
        debug!("forwarding alerts to webhook {url}");
        sink = sink.with(Arc::new(WebhookSink::new(url)));
    }
    Arc::new(sink)
}
