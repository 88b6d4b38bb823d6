//! Actor-based sampling
//!
//! The scheduler runs as an independent tokio task and is the only writer of
//! the [`StatsStore`](crate::store::StatsStore). It is controlled through a
//! [`SchedulerHandle`](scheduler::SchedulerHandle).
//!
//! ```text
//!   SchedulerHandle ──commands──▶ Scheduler ──write──▶ StatsStore ◀──read── API / console
//!                                     │
//!                                     └──alerts──▶ AlertSink (log, webhook)
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: mpsc command channel for control messages
//! 2. **Request/Response**: oneshot channels for tick results and shutdown acknowledgement
//! 3. **State**: a watch channel publishes whether a tick is armed

pub mod messages;
pub mod scheduler;
