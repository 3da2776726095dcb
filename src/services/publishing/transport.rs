//! Delivery primitive injected into the publishing service.

use crate::models::Event;
use async_trait::async_trait;

/// Sends an event to relays and reports which ones acknowledged it.
///
/// Partial success is normal: return the subset of `relays` that accepted the
/// event. An `Err` means the attempt as a whole failed and will be retried.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn publish_to_relays(&self, event: &Event, relays: &[String]) -> anyhow::Result<Vec<String>>;
}
