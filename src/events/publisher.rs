use crate::constants::limits::STATUS_CHANNEL_CAPACITY;
use crate::models::StatusChange;
use tokio::sync::broadcast;

/// Fan-out of lifecycle status transitions to dashboards and other observers
#[derive(Debug, Clone)]
pub struct StatusPublisher {
    sender: broadcast::Sender<StatusChange>,
}

impl StatusPublisher {
    /// Create a new publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a status change.
    ///
    /// Having no subscribers is not an error; slow subscribers observe
    /// `RecvError::Lagged` instead of blocking the pipeline.
    pub fn publish(&self, change: StatusChange) {
        let _ = self.sender.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new(STATUS_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::LifecycleStatus;
    use crate::models::EventStatus;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let publisher = StatusPublisher::default();
        publisher.publish(StatusChange {
            event_id: "abc".into(),
            previous: None,
            status: EventStatus::new(LifecycleStatus::Created),
        });
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_changes() {
        let publisher = StatusPublisher::new(8);
        let mut rx = publisher.subscribe();
        publisher.publish(StatusChange {
            event_id: "abc".into(),
            previous: Some(LifecycleStatus::Created),
            status: EventStatus::new(LifecycleStatus::Validated),
        });
        let change = rx.recv().await.unwrap();
        assert_eq!(change.event_id, "abc");
        assert_eq!(change.status.status, LifecycleStatus::Validated);
    }
}
