//! Shared state handed to every handler

use std::sync::Arc;

use crate::{
    actors::scheduler::SchedulerHandle, monitors::thresholds::ThresholdHandle,
    store::SnapshotReader,
};

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Read side of the snapshot store
    pub reader: Arc<dyn SnapshotReader>,

    /// Live thresholds, shared with the scheduler
    pub thresholds: ThresholdHandle,

    /// Handle to the scheduler, used for status reporting
    pub scheduler: SchedulerHandle,
}

impl ApiState {
    pub fn new(
        reader: Arc<dyn SnapshotReader>,
        thresholds: ThresholdHandle,
        scheduler: SchedulerHandle,
    ) -> Self {
        Self {
            reader,
            thresholds,
            scheduler,
        }
    }
}
