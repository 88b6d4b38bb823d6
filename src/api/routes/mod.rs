//! Route handlers, one module per resource

pub mod health;
pub mod report;
pub mod snapshot;
pub mod thresholds;
