//! Readers racing the scheduler

use std::time::Duration;

use sys_health::Snapshot;

use crate::helpers::*;

fn consistent(snapshot: &Snapshot, total_kib_per_tick: u64) -> bool {
    snapshot.sample.memory_total_mb == snapshot.tick * total_kib_per_tick / 1024
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_see_whole_snapshots() {
    let procfs = FakeProcfs::new(Reading::default());
    let p = manual_pipeline(&procfs);

    let mut readers = vec![];
    for _ in 0..8 {
        let store = p.store.clone();
        readers.push(tokio::spawn(async move {
            let mut last_tick = 0;
            for _ in 0..500 {
                if let Some(snapshot) = store.read().await {
                    assert!(consistent(&snapshot, 1024 * 1024));
                    // snapshots never go backwards
                    assert!(snapshot.tick >= last_tick);
                    last_tick = snapshot.tick;
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    // memory total in tick N is N GiB, so fields from different ticks would not match
    for tick in 1..=20u64 {
        procfs.set(Reading {
            total_kib: tick * 1024 * 1024,
            free_kib: 0,
            ..Reading::default()
        });
        p.scheduler.tick_now().await.unwrap();
    }

    for reader in readers {
        reader.await.unwrap();
    }

    p.scheduler.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_threshold_updates_are_never_torn() {
    let procfs = FakeProcfs::new(Reading::default());
    let p = pipeline(&procfs, Duration::from_millis(5));

    let writer = {
        let thresholds = p.thresholds.clone();
        tokio::spawn(async move {
            for i in 0..200u32 {
                let value = f64::from(i % 100);
                thresholds.set_memory_percent(value).await.unwrap();
            }
        })
    };

    for _ in 0..200 {
        let current = p.thresholds.current().await.memory_percent;
        assert!((0.0..=100.0).contains(&current));
        tokio::task::yield_now().await;
    }

    writer.await.unwrap();
    p.scheduler.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_handle_clones_share_one_scheduler() {
    let procfs = FakeProcfs::new(Reading::default());
    let p = manual_pipeline(&procfs);

    let mut tasks = vec![];
    for _ in 0..5 {
        let handle = p.scheduler.clone();
        tasks.push(tokio::spawn(async move { handle.tick_now().await }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(p.store.read().await.map(|s| s.tick), Some(5));

    // stop through a clone, then through the original
    p.scheduler.clone().stop().await;
    p.scheduler.stop().await;
}
