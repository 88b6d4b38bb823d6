//! Response bodies of the JSON routes

use serde::{Deserialize, Serialize};

use crate::{
    Thresholds, actors::messages::SchedulerState, monitors::thresholds::ThresholdUpdate,
};

/// Body of `GET /api/v1/health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub scheduler: SchedulerState,
}

/// Body of `GET` and `PUT /api/v1/thresholds`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ThresholdsResponse {
    pub memory_threshold_percent: f64,
    pub cpu_threshold: f64,
    pub disk_io_threshold: u64,
    pub disk_space_threshold_percent: f64,
}

impl From<Thresholds> for ThresholdsResponse {
    fn from(t: Thresholds) -> Self {
        Self {
            memory_threshold_percent: t.memory_percent,
            cpu_threshold: t.cpu,
            disk_io_threshold: t.disk_io,
            disk_space_threshold_percent: t.disk_space_percent,
        }
    }
}

/// Body of `PUT /api/v1/thresholds`; omitted fields keep their value
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ThresholdsRequest {
    pub memory_threshold_percent: Option<f64>,
    pub cpu_threshold: Option<f64>,
    pub disk_io_threshold: Option<u64>,
    pub disk_space_threshold_percent: Option<f64>,
}

impl From<ThresholdsRequest> for ThresholdUpdate {
    fn from(req: ThresholdsRequest) -> Self {
        Self {
            memory_percent: req.memory_threshold_percent,
            cpu: req.cpu_threshold,
            disk_io: req.disk_io_threshold,
            disk_space_percent: req.disk_space_threshold_percent,
        }
    }
}
