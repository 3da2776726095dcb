//! Priority ordering, capacity and scheduling behaviour of the QueueManager.

mod common;

use common::*;
use parking_lot::Mutex;
use relaycast_core::config::QueueConfig;
use relaycast_core::constants::Priority;
use relaycast_core::models::SubmitOptions;
use relaycast_core::orchestration::{processor, QueueManager};
use relaycast_core::PipelineError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn queue_config(max_concurrent: usize) -> QueueConfig {
    QueueConfig {
        max_concurrent_processing: max_concurrent,
        processing_interval_ms: 5,
        ..QueueConfig::default()
    }
}

/// Processor that records the content of each event it sees
fn recording_queue(max_concurrent: usize) -> (QueueManager, Arc<Mutex<Vec<String>>>) {
    let queue = QueueManager::new(queue_config(max_concurrent));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    queue.register_processor(
        "record",
        processor(move |item| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push(item.event.content.clone());
                Ok(())
            }
        }),
    );
    (queue, seen)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Run ticks one at a time, letting each dispatched item finish first
async fn drain(queue: &QueueManager) {
    while queue.get_queue_status().queue_length > 0 {
        queue.tick();
        wait_until(|| queue.get_queue_status().processing_count == 0).await;
    }
}

#[tokio::test]
async fn test_high_priority_is_processed_before_earlier_normal_items() {
    let (queue, seen) = recording_queue(1);
    for (content, priority) in [
        ("normal-1", Priority::Normal),
        ("normal-2", Priority::Normal),
        ("high", Priority::High),
    ] {
        queue
            .enqueue(
                EventBuilder::text_note(content).build(),
                priority,
                SubmitOptions::default(),
            )
            .unwrap();
    }

    drain(&queue).await;

    assert_eq!(*seen.lock(), vec!["high", "normal-1", "normal-2"]);
}

#[tokio::test]
async fn test_low_priority_waits_for_normal() {
    let (queue, seen) = recording_queue(1);
    queue
        .enqueue(EventBuilder::text_note("low").build(), Priority::Low, SubmitOptions::default())
        .unwrap();
    queue
        .enqueue(EventBuilder::text_note("normal").build(), Priority::Normal, SubmitOptions::default())
        .unwrap();

    drain(&queue).await;

    assert_eq!(*seen.lock(), vec!["normal", "low"]);
}

#[tokio::test]
async fn test_enqueue_beyond_capacity_fails_without_mutation() {
    let queue = QueueManager::new(QueueConfig::default());
    for i in 0..100 {
        queue
            .enqueue(
                EventBuilder::text_note(&format!("n{i}")).build(),
                Priority::Normal,
                SubmitOptions::default(),
            )
            .unwrap();
    }

    let err = queue
        .enqueue(EventBuilder::text_note("overflow").build(), Priority::High, SubmitOptions::default())
        .unwrap_err();

    assert!(matches!(err, PipelineError::Queue { .. }));
    let status = queue.get_queue_status();
    assert_eq!(status.queue_length, 100);
    assert_eq!(status.max_queue_size, 100);
    assert!(queue.pending().iter().all(|q| q.event.content != "overflow"));
}

#[tokio::test]
async fn test_scheduler_never_dispatches_an_item_twice() {
    let queue = QueueManager::new(queue_config(5));
    let counts: Arc<Mutex<HashMap<String, usize>>> = Arc::default();
    let sink = Arc::clone(&counts);
    queue.register_processor(
        "count",
        processor(move |item| {
            let sink = Arc::clone(&sink);
            async move {
                tokio::time::sleep(Duration::from_millis(3)).await;
                *sink.lock().entry(item.id.clone()).or_default() += 1;
                Ok(())
            }
        }),
    );

    for i in 0..20 {
        queue
            .enqueue(
                EventBuilder::text_note(&format!("e{i}")).build(),
                Priority::Normal,
                SubmitOptions::default(),
            )
            .unwrap();
    }
    queue.start_processing();
    wait_until(|| counts.lock().len() == 20).await;
    queue.stop_processing();

    assert!(counts.lock().values().all(|&n| n == 1));
}

#[tokio::test]
async fn test_in_flight_never_exceeds_concurrency_cap() {
    let queue = Arc::new(QueueManager::new(queue_config(2)));
    let peak = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));
    {
        let queue_for_probe = Arc::downgrade(&queue);
        let peak = Arc::clone(&peak);
        let done = Arc::clone(&done);
        queue.register_processor(
            "probe",
            processor(move |_item| {
                let queue = queue_for_probe.clone();
                let peak = Arc::clone(&peak);
                let done = Arc::clone(&done);
                async move {
                    if let Some(queue) = queue.upgrade() {
                        peak.fetch_max(queue.get_queue_status().processing_count, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );
    }

    for i in 0..8 {
        queue
            .enqueue(
                EventBuilder::text_note(&format!("e{i}")).build(),
                Priority::Normal,
                SubmitOptions::default(),
            )
            .unwrap();
    }
    queue.start_processing();
    wait_until(|| done.load(Ordering::SeqCst) == 8).await;
    queue.stop_processing();

    let peak = peak.load(Ordering::SeqCst);
    assert!(peak >= 1 && peak <= 2, "peak in-flight was {peak}");
}

#[tokio::test]
async fn test_stale_in_flight_items_are_abandoned() {
    let queue = QueueManager::new(QueueConfig {
        max_concurrent_processing: 1,
        abandonment_window_ms: 0,
        ..QueueConfig::default()
    });
    let started = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&started);
    queue.register_processor(
        "hang",
        processor(move |_item| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::pending::<()>().await;
                Ok(())
            }
        }),
    );
    for name in ["a", "b"] {
        queue
            .enqueue(EventBuilder::text_note(name).build(), Priority::Normal, SubmitOptions::default())
            .unwrap();
    }

    assert_eq!(queue.tick(), 1);
    assert_eq!(queue.get_queue_status().processing_count, 1);
    tokio::time::sleep(Duration::from_millis(2)).await;

    assert_eq!(queue.tick(), 1);
    wait_until(|| started.load(Ordering::SeqCst) == 2).await;
    assert_eq!(queue.get_queue_status().queue_length, 0);
}

#[tokio::test]
async fn test_clear_queue_keeps_in_flight_items() {
    let queue = QueueManager::new(queue_config(1));
    queue.register_processor(
        "hang",
        processor(|_item| async {
            std::future::pending::<()>().await;
            Ok(())
        }),
    );
    for name in ["a", "b", "c"] {
        queue
            .enqueue(EventBuilder::text_note(name).build(), Priority::Normal, SubmitOptions::default())
            .unwrap();
    }
    queue.tick();

    assert_eq!(queue.clear_queue(), 2);
    let status = queue.get_queue_status();
    assert_eq!(status.queue_length, 0);
    assert_eq!(status.processing_count, 1);
}

#[tokio::test]
async fn test_start_and_stop_processing() {
    let (queue, seen) = recording_queue(5);
    assert!(!queue.get_queue_status().is_processing);

    queue.start_processing();
    queue.start_processing();
    assert!(queue.is_processing());

    queue
        .enqueue(EventBuilder::text_note("x").build(), Priority::Normal, SubmitOptions::default())
        .unwrap();
    wait_until(|| seen.lock().len() == 1).await;

    queue.stop_processing();
    assert!(!queue.is_processing());

    queue
        .enqueue(EventBuilder::text_note("y").build(), Priority::Normal, SubmitOptions::default())
        .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(seen.lock().len(), 1);
    assert_eq!(queue.get_queue_status().queue_length, 1);
}
