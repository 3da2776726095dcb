//! # Priority Queue Manager
//!
//! Bounded priority queue plus a background scheduler that hands items to the
//! registered processors under a concurrency cap.
//!
//! ## Ordering
//!
//! - `High` items are inserted at the head; `Normal`/`Low` are appended.
//! - Every tick re-sorts pending items by priority class, then arrival, so
//!   FIFO holds within a class and `High` always goes first.
//! - An item joins the in-flight set inside the same critical section that
//!   pops it, so a later tick can never dispatch it twice.
//!
//! ```rust,no_run
//! use relaycast_core::config::QueueConfig;
//! use relaycast_core::orchestration::queue_manager::{processor, QueueManager};
//!
//! # async fn example() {
//! let queue = QueueManager::new(QueueConfig::default());
//! queue.register_processor("log", processor(|item| async move {
//!     tracing::info!(queue_id = %item.id, "processing");
//!     Ok(())
//! }));
//! queue.start_processing();
//! # }
//! ```

use crate::config::QueueConfig;
use crate::constants::{Priority, QueueItemStatus};
use crate::error::{PipelineError, Result};
use crate::logging::log_queue_operation;
use crate::models::{QueuedEvent, SubmitOptions, UnsignedEvent};
use chrono::Utc;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Callback invoked for every dequeued item. Errors are logged, never retried.
pub type EventProcessor =
    Arc<dyn Fn(QueuedEvent) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Wrap an async closure as an [`EventProcessor`]
pub fn processor<F, Fut>(f: F) -> EventProcessor
where
    F: Fn(QueuedEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |item| Box::pin(f(item)))
}

/// Snapshot of queue occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub queue_length: usize,
    pub processing_count: usize,
    pub max_queue_size: usize,
    pub max_concurrent_processing: usize,
    pub is_processing: bool,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueuedEvent>,
    in_flight: HashMap<String, QueuedEvent>,
    next_sequence: u64,
}

struct QueueInner {
    config: QueueConfig,
    state: Mutex<QueueState>,
    processors: RwLock<Vec<(String, EventProcessor)>>,
}

pub struct QueueManager {
    inner: Arc<QueueInner>,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for QueueManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueManager")
            .field("config", &self.inner.config)
            .field("status", &self.get_queue_status())
            .finish()
    }
}

impl QueueManager {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                config,
                state: Mutex::new(QueueState::default()),
                processors: RwLock::new(Vec::new()),
            }),
            scheduler: Mutex::new(None),
        }
    }

    /// Add an event to the queue. Fails without touching the queue when it
    /// already holds `max_queue_size` pending items.
    pub fn enqueue(
        &self,
        event: UnsignedEvent,
        priority: Priority,
        options: SubmitOptions,
    ) -> Result<QueuedEvent> {
        let mut state = self.inner.state.lock();
        let max = self.inner.config.max_queue_size;
        if state.pending.len() >= max {
            warn!(max_queue_size = max, "Queue full, rejecting event");
            return Err(PipelineError::queue(format!(
                "queue is full (max {max} events)"
            )));
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let item = QueuedEvent::new(event, priority, options, sequence);
        match priority {
            Priority::High => state.pending.push_front(item.clone()),
            Priority::Normal | Priority::Low => state.pending.push_back(item.clone()),
        }

        log_queue_operation(
            "enqueue",
            Some(&item.id),
            Some(priority.as_str()),
            state.pending.len(),
            state.in_flight.len(),
        );
        Ok(item)
    }

    /// Register (or replace) a processor under `name`
    pub fn register_processor(&self, name: impl Into<String>, processor: EventProcessor) {
        let name = name.into();
        let mut processors = self.inner.processors.write();
        if let Some(slot) = processors.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = processor;
            debug!(processor = %name, "Processor replaced");
        } else {
            processors.push((name.clone(), processor));
            debug!(processor = %name, "Processor registered");
        }
    }

    pub fn unregister_processor(&self, name: &str) -> bool {
        let mut processors = self.inner.processors.write();
        let before = processors.len();
        processors.retain(|(n, _)| n != name);
        processors.len() != before
    }

    pub fn processor_count(&self) -> usize {
        self.inner.processors.read().len()
    }

    /// Run one scheduler pass. Returns how many items were dispatched.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn tick(&self) -> usize {
        self.inner.tick()
    }

    /// Start the background scheduler; no-op when already running
    pub fn start_processing(&self) {
        let mut scheduler = self.scheduler.lock();
        if scheduler.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let period = inner.config.processing_interval();
        *scheduler = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                inner.tick();
            }
        }));
        info!(
            interval_ms = period.as_millis() as u64,
            max_concurrent = self.inner.config.max_concurrent_processing,
            "Queue processing started"
        );
    }

    /// Halt the scheduler. Items already handed to processors keep running.
    pub fn stop_processing(&self) {
        if let Some(handle) = self.scheduler.lock().take() {
            handle.abort();
            info!("Queue processing stopped");
        }
    }

    pub fn is_processing(&self) -> bool {
        self.scheduler
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub fn get_queue_status(&self) -> QueueStatus {
        let (queue_length, processing_count) = {
            let state = self.inner.state.lock();
            (state.pending.len(), state.in_flight.len())
        };
        QueueStatus {
            queue_length,
            processing_count,
            max_queue_size: self.inner.config.max_queue_size,
            max_concurrent_processing: self.inner.config.max_concurrent_processing,
            is_processing: self.is_processing(),
        }
    }

    /// Drop every pending item; in-flight items are unaffected
    pub fn clear_queue(&self) -> usize {
        let mut state = self.inner.state.lock();
        let dropped = state.pending.len();
        state.pending.clear();
        info!(dropped, "Queue cleared");
        dropped
    }

    /// Pending items in dequeue order
    pub fn pending(&self) -> Vec<QueuedEvent> {
        let state = self.inner.state.lock();
        let mut items: Vec<_> = state.pending.iter().cloned().collect();
        items.sort_by_key(QueuedEvent::sort_key);
        items
    }
}

impl Drop for QueueManager {
    fn drop(&mut self) {
        if let Some(handle) = self.scheduler.get_mut().take() {
            handle.abort();
        }
    }
}

impl QueueInner {
    fn tick(self: &Arc<Self>) -> usize {
        self.abandon_stale();

        let processors: Vec<EventProcessor> = self
            .processors
            .read()
            .iter()
            .map(|(_, p)| Arc::clone(p))
            .collect();
        if processors.is_empty() {
            return 0;
        }

        let mut dispatched = 0;
        loop {
            let item = {
                let mut state = self.state.lock();
                if state.in_flight.len() >= self.config.max_concurrent_processing {
                    break;
                }
                state
                    .pending
                    .make_contiguous()
                    .sort_by_key(QueuedEvent::sort_key);
                let Some(mut item) = state.pending.pop_front() else {
                    break;
                };
                item.status = QueueItemStatus::Processing;
                item.started_at = Some(Utc::now());
                state.in_flight.insert(item.id.clone(), item.clone());
                log_queue_operation(
                    "dequeue",
                    Some(&item.id),
                    Some(item.priority.as_str()),
                    state.pending.len(),
                    state.in_flight.len(),
                );
                item
            };

            dispatched += 1;
            let inner = Arc::clone(self);
            let processors = processors.clone();
            tokio::spawn(async move { inner.run_processors(item, processors).await });
        }
        dispatched
    }

    async fn run_processors(&self, item: QueuedEvent, processors: Vec<EventProcessor>) {
        let queue_id = item.id.clone();
        // A panicking processor must still release its in-flight slot.
        let results = join_all(processors.iter().map(|p| {
            let p = Arc::clone(p);
            let item = item.clone();
            AssertUnwindSafe(async move { p(item).await }).catch_unwind()
        }))
        .await;

        let mut status = QueueItemStatus::Completed;
        for result in results {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    status = QueueItemStatus::Failed;
                    error!(queue_id = %queue_id, error = %e, "Queue processor failed");
                }
                Err(panic) => {
                    status = QueueItemStatus::Failed;
                    error!(
                        queue_id = %queue_id,
                        panic = panic_message(panic.as_ref()),
                        "Queue processor panicked"
                    );
                }
            }
        }

        let mut state = self.state.lock();
        state.in_flight.remove(&queue_id);
        debug!(
            queue_id = %queue_id,
            status = ?status,
            in_flight = state.in_flight.len(),
            "Queue item finished"
        );
    }

    fn abandon_stale(&self) {
        let window = match chrono::Duration::from_std(self.config.abandonment_window()) {
            Ok(window) => window,
            Err(_) => return,
        };
        let now = Utc::now();
        let mut state = self.state.lock();
        state.in_flight.retain(|id, item| {
            let fresh = item.started_at.map_or(true, |started| now - started < window);
            if !fresh {
                warn!(queue_id = %id, "Abandoning in-flight item past its processing window");
            }
            fresh
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
