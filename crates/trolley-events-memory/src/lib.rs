//! In-memory event bus implementation using tokio broadcast channels.
//!
//! Suitable for single server deployments and tests. Replicas do not see
//! each other's events.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use trolley_events::{EventBus, EventBusError, EventStream, ItemChangeEvent};
use trolley_storage::ListId;

const CHANNEL_CAPACITY: usize = 100;

/// In-memory event bus with one broadcast channel per list.
pub struct MemoryEventBus {
    channels: Arc<DashMap<ListId, broadcast::Sender<ItemChangeEvent>>>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
        }
    }

    /// Number of lists with a live channel.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(
        &self,
        list_id: &ListId,
        event: ItemChangeEvent,
    ) -> Result<(), EventBusError> {
        // Nobody ever subscribed: nothing to deliver.
        let Some(tx) = self.channels.get(list_id).map(|e| e.value().clone()) else {
            return Ok(());
        };

        if tx.send(event).is_err() {
            // Every subscriber went away; drop the channel unless one raced in.
            self.channels
                .remove_if(list_id, |_, sender| sender.receiver_count() == 0);
        }

        Ok(())
    }

    async fn subscribe(&self, list_id: &ListId) -> Result<EventStream, EventBusError> {
        let rx = self
            .channels
            .entry(list_id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();

        // Lagged receivers skip what they missed; the client resyncs.
        let stream = BroadcastStream::new(rx).filter_map(|result| result.ok());

        Ok(Box::pin(stream))
    }

    async fn close(&self, list_id: &ListId) -> Result<(), EventBusError> {
        // Dropping the last sender ends every receiver's stream.
        self.channels.remove(list_id);
        Ok(())
    }
}
