//! Periodic participants with unrelated periods, driven on a paused tokio
//! clock so that the interleaving is reproducible.
#![cfg(not(loom))]

use std::{sync::Arc, time::Duration};

use cycle_sync::CycleBarrier;
use parking_lot::Mutex;
use tokio::time::sleep;

const SEPARATOR: &str = "--";

type Log = Arc<Mutex<Vec<&'static str>>>;

/// `work; arrive; sleep` for `units` iterations.
async fn participant<F>(
    name: &'static str,
    burst: Option<Duration>,
    period: Duration,
    units: usize,
    barrier: Arc<CycleBarrier<F>>,
    log: Log,
) where
    F: FnMut(),
{
    for _ in 0..units {
        if let Some(burst) = burst {
            sleep(burst).await;
        }
        log.lock().push(name);
        barrier.arrive();
        sleep(period).await;
    }
}

fn separating_barrier(participants: usize, log: &Log) -> Arc<CycleBarrier<impl FnMut() + Send>> {
    let log = log.clone();
    Arc::new(CycleBarrier::new(participants, move || log.lock().push(SEPARATOR)).unwrap())
}

#[tokio::test(start_paused = true)]
async fn three_threads_unrelated_periods() {
    let log: Log = Arc::default();
    let barrier = separating_barrier(3, &log);

    let tasks = [
        ("T1", 700),
        ("T2", 1200),
        ("MAIN", 2000),
    ]
    .map(|(name, period)| {
        tokio::spawn(participant(
            name,
            None,
            Duration::from_millis(period),
            6,
            barrier.clone(),
            log.clone(),
        ))
    });

    for task in tasks {
        task.await.unwrap();
    }

    let log = log.lock();
    assert_eq!(
        log[..8],
        ["T1", "T2", "MAIN", SEPARATOR, "T1", "T2", "T1", SEPARATOR]
    );
    assert_eq!(log.iter().filter(|e| **e == SEPARATOR).count(), 6);
    assert_eq!(barrier.completed_rounds(), 6);
    assert_eq!(barrier.arrivals(), 0);
}

#[tokio::test(start_paused = true)]
async fn burst_participant() {
    let log: Log = Arc::default();
    let barrier = separating_barrier(3, &log);

    let tasks = [
        ("T1", None, 500),
        ("T2", None, 200),
        ("T3", Some(Duration::from_millis(100)), 800),
    ]
    .map(|(name, burst, period)| {
        tokio::spawn(participant(
            name,
            burst,
            Duration::from_millis(period),
            10,
            barrier.clone(),
            log.clone(),
        ))
    });

    for task in tasks {
        task.await.unwrap();
    }

    // The fast participant dominates the early rounds, rounds are counted
    // in arrivals and not per participant.
    let log = log.lock();
    assert_eq!(log[..4], ["T1", "T2", "T3", SEPARATOR]);
    assert_eq!(log.iter().filter(|e| **e == SEPARATOR).count(), 10);
    assert_eq!(barrier.completed_rounds(), 10);
}

#[tokio::test(start_paused = true)]
async fn missing_participant_stalls_rounds() {
    let log: Log = Arc::default();
    let barrier = separating_barrier(3, &log);

    // Only two of the three configured participants ever show up.
    let tasks = [("T1", 300), ("T2", 500)].map(|(name, period)| {
        tokio::spawn(participant(
            name,
            None,
            Duration::from_millis(period),
            1,
            barrier.clone(),
            log.clone(),
        ))
    });

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(barrier.completed_rounds(), 0);
    assert_eq!(barrier.arrivals(), 2);
    assert!(!log.lock().contains(&SEPARATOR));
}
