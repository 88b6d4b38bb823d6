//! Source failures and shutdown behavior

use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use sys_health::{HealthError, actors::messages::SchedulerState};

use crate::helpers::*;

#[tokio::test]
async fn test_failed_tick_keeps_last_snapshot() {
    let procfs = FakeProcfs::new(Reading::default());
    let p = manual_pipeline(&procfs);
    let good = p.scheduler.tick_now().await.unwrap().snapshot;

    procfs.break_stat();
    let result = p.scheduler.tick_now().await;

    assert_matches!(result, Err(HealthError::SourceUnavailable { .. }));
    assert_eq!(p.store.read().await, Some(good));

    p.scheduler.stop().await;
}

#[tokio::test]
async fn test_failed_tick_does_not_move_the_baseline() {
    let procfs = FakeProcfs::new(Reading::default());
    let p = manual_pipeline(&procfs);
    p.scheduler.tick_now().await.unwrap();

    procfs.break_stat();
    assert!(p.scheduler.tick_now().await.is_err());

    procfs.set(Reading {
        pages_in: 160,
        ..Reading::default()
    });
    let sample = p.scheduler.tick_now().await.unwrap().snapshot.sample;

    // delta against the last successful tick
    assert_eq!(sample.pages_in_delta, 60);

    p.scheduler.stop().await;
}

#[tokio::test]
async fn test_overflowing_cpu_counters_are_a_failed_tick() {
    let procfs = FakeProcfs::new(Reading::default());
    let p = manual_pipeline(&procfs);

    let max = u64::MAX;
    procfs.write_stat(&format!("cpu  {max} {max} 0 {max} 1 0 0 0 0 0\n"));
    assert_matches!(
        p.scheduler.tick_now().await,
        Err(HealthError::SourceUnavailable { reason, .. }) if reason == "cpu counters overflow"
    );
    assert_eq!(p.scheduler.state(), SchedulerState::Armed);

    procfs.set(Reading::default());
    let outcome = p.scheduler.tick_now().await.unwrap();
    assert_eq!(outcome.snapshot.tick, 1);

    p.scheduler.stop().await;
}

#[tokio::test]
async fn test_missing_procfs_never_writes() {
    let procfs = FakeProcfs::new(Reading::default());
    std::fs::remove_file(procfs.path().join("meminfo")).unwrap();
    let p = pipeline(&procfs, Duration::from_millis(10));

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(p.store.read().await, None);
    assert!(p.sink.alerts().is_empty());

    // the scheduler keeps ticking and picks the source back up
    procfs.set(Reading::default());
    let outcome = p.scheduler.tick_now().await.unwrap();
    assert!(outcome.snapshot.tick >= 1);

    p.scheduler.stop().await;
}

#[tokio::test]
async fn test_snapshot_is_frozen_after_stop() {
    let procfs = FakeProcfs::new(Reading::default());
    let p = pipeline(&procfs, Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(50)).await;

    p.scheduler.stop().await;
    let frozen = p.store.read().await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(p.store.read().await, frozen);
    assert_matches!(p.scheduler.tick_now().await, Err(HealthError::SchedulerStopped));
}
