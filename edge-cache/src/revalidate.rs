//! Revalidation Publisher — fire-and-forget enqueue of a background
//! refresh request on the shared store's `revalidate` channel.
//!
//! Out-of-process workers subscribe to this channel and re-run the full
//! pipeline for the published URI. This crate only ever publishes; no
//! subscriber runs here.

use std::sync::Arc;

use crate::error::Result;
use crate::store::{CacheStore, REVALIDATE_CHANNEL};

/// Publishes `uri_full` values on the well-known `revalidate` channel.
#[derive(Clone)]
pub struct RevalidationPublisher {
    store: Arc<dyn CacheStore>,
}

impl RevalidationPublisher {
    /// Build a publisher against the given store.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Enqueue a background revalidation for `uri_full`. Returns as soon
    /// as the publish is accepted by the store; does not wait for a
    /// subscriber to act on it.
    pub async fn publish(&self, uri_full: &str) -> Result<()> {
        self.store.publish(REVALIDATE_CHANNEL, uri_full).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn publish_goes_to_the_well_known_channel() {
        let store = Arc::new(MemoryStore::new());
        let publisher = RevalidationPublisher::new(store.clone());
        publisher.publish("https://example.com/a").await.unwrap();
        assert_eq!(
            store.published(),
            vec![(REVALIDATE_CHANNEL.to_string(), "https://example.com/a".to_string())]
        );
    }
}
