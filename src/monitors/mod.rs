//! Pure computations performed on every tick: deriving a sample from raw
//! counters and evaluating it against the configured thresholds.

pub mod sample;
pub mod thresholds;
