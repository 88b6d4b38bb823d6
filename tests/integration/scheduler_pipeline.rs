//! End-to-end ticks: fake procfs -> scheduler -> store -> alerts

use std::time::Duration;

use pretty_assertions::assert_eq;
use sys_health::{actors::messages::SchedulerState, monitors::thresholds::AlertMetric, report};

use crate::helpers::*;

#[tokio::test]
async fn test_first_tick_has_no_cpu_and_zero_deltas() {
    let procfs = FakeProcfs::new(Reading::default());
    let p = manual_pipeline(&procfs);

    let outcome = p.scheduler.tick_now().await.unwrap();

    let sample = outcome.snapshot.sample;
    assert_eq!(sample.cpu_busy_percent, None);
    assert_eq!(sample.pages_in_delta, 0);
    assert_eq!(sample.pages_out_delta, 0);
    assert_eq!(sample.memory_total_mb, 4096);
    assert_eq!(sample.memory_free_mb, 3072);
    assert_eq!(sample.memory_used_percent, 25.0);
    assert_eq!(p.store.read().await, Some(outcome.snapshot));

    p.scheduler.stop().await;
}

#[tokio::test]
async fn test_second_tick_derives_cpu_and_deltas() {
    let procfs = FakeProcfs::new(Reading::default());
    let p = manual_pipeline(&procfs);
    p.scheduler.tick_now().await.unwrap();

    procfs.set(Reading {
        busy: 1_500,
        idle: 9_500,
        pages_in: 130,
        pages_out: 110,
        ..Reading::default()
    });
    let outcome = p.scheduler.tick_now().await.unwrap();

    let sample = outcome.snapshot.sample;
    assert_eq!(sample.cpu_busy_percent, Some(50.0));
    assert_eq!(sample.pages_in_delta, 30);
    assert_eq!(sample.pages_out_delta, 10);
    assert_eq!(outcome.snapshot.tick, 2);

    p.scheduler.stop().await;
}

#[tokio::test]
async fn test_memory_only_alert() {
    let procfs = FakeProcfs::new(Reading {
        total_kib: 100 * 1024,
        free_kib: 10 * 1024,
        available_kib: Some(15 * 1024),
        ..Reading::default()
    });
    let p = manual_pipeline(&procfs);
    p.scheduler.tick_now().await.unwrap();

    // 50 pages in, CPU busy well below 150
    procfs.set(Reading {
        total_kib: 100 * 1024,
        free_kib: 10 * 1024,
        available_kib: Some(15 * 1024),
        busy: 1_010,
        idle: 9_990,
        pages_in: 150,
        ..Reading::default()
    });
    let outcome = p.scheduler.tick_now().await.unwrap();

    assert_eq!(outcome.alerts.len(), 1);
    assert_eq!(outcome.alerts[0].metric, AlertMetric::Memory);
    assert_eq!(outcome.alerts[0].observed, 85.0);
    assert_eq!(outcome.alerts[0].threshold, 80.0);
    // both ticks exceeded the memory limit
    assert_eq!(p.sink.alerts().len(), 2);

    p.scheduler.stop().await;
}

#[tokio::test]
async fn test_counter_reset_clamps_deltas() {
    let procfs = FakeProcfs::new(Reading {
        pages_in: 10_000,
        pages_out: 10_000,
        ..Reading::default()
    });
    let p = manual_pipeline(&procfs);
    p.scheduler.tick_now().await.unwrap();

    procfs.set(Reading {
        pages_in: 5,
        pages_out: 5,
        busy: 10,
        idle: 10,
        ..Reading::default()
    });
    let sample = p.scheduler.tick_now().await.unwrap().snapshot.sample;

    assert_eq!(sample.pages_in_delta, 0);
    assert_eq!(sample.pages_out_delta, 0);
    assert_eq!(sample.cpu_busy_percent, None);

    p.scheduler.stop().await;
}

#[tokio::test]
async fn test_threshold_update_applies_to_next_tick() {
    let procfs = FakeProcfs::new(Reading::default());
    let p = manual_pipeline(&procfs);

    let outcome = p.scheduler.tick_now().await.unwrap();
    assert!(outcome.alerts.is_empty());

    p.thresholds.set_memory_percent(10.0).await.unwrap();
    let outcome = p.scheduler.tick_now().await.unwrap();

    assert_eq!(outcome.snapshot.thresholds.memory_percent, 10.0);
    assert_eq!(outcome.alerts.len(), 1);
    assert!(report::render(Some(&outcome.snapshot)).contains("ALERT: memory usage 25.00%"));

    p.scheduler.stop().await;
}

#[tokio::test]
async fn test_timer_drives_ticks() {
    let procfs = FakeProcfs::new(Reading::default());
    let p = pipeline(&procfs, Duration::from_millis(20));
    assert_eq!(p.scheduler.state(), SchedulerState::Armed);

    tokio::time::sleep(Duration::from_millis(200)).await;
    p.scheduler.stop().await;

    let ticks = p.store.read().await.map(|s| s.tick).unwrap_or(0);
    assert!(ticks >= 2, "expected at least 2 ticks, got {ticks}");
    assert_eq!(p.scheduler.state(), SchedulerState::Idle);
}
