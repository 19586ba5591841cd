//! In-process synchronous event bus
//!
//! The bus maps topic names to the handlers subscribed to them. `publish`
//! calls every handler of the topic on the caller's thread, in subscription
//! order, before returning.
//!
//! ## Usage
//!
//! ```rust
//! use rtcm_sdlog_core::bus::LocalEventBus;
//! use rtcm_sdlog_core::traits::{DataEvent, EventBus, EventHandler};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl EventHandler for Printer {
//!     fn handle(&self, event: &DataEvent<'_>) {
//!         println!("{} bytes on {}", event.payload.len(), event.topic);
//!     }
//! }
//!
//! let bus = LocalEventBus::new();
//! let id = bus.subscribe("serial.read", Arc::new(Printer)).unwrap();
//! assert_eq!(bus.publish("serial.read", 3, b"abc").unwrap(), 1);
//! bus.unsubscribe(id).unwrap();
//! ```

use crate::error::{Error, Result};
use crate::traits::{DataEvent, EventBus, EventHandler, SubscriptionId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, trace};

/// A registered handler
#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    handler: Arc<dyn EventHandler>,
}

/// Event bus delivering on the publisher's thread
///
/// ## Thread Safety
///
/// Subscriptions live behind a `RwLock`. Handlers are cloned out of the lock
/// before they run, so a handler may subscribe or unsubscribe without
/// deadlocking.
#[derive(Default)]
pub struct LocalEventBus {
    /// Handlers by topic
    topics: RwLock<HashMap<String, Vec<Subscription>>>,

    /// Next subscription ID
    next_id: AtomicU64,
}

impl LocalEventBus {
    /// Create a bus with no subscriptions
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handlers subscribed to `topic`
    pub fn subscriber_count(&self, topic: &str) -> usize {
        let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
        topics.get(topic).map_or(0, Vec::len)
    }

    /// List all topics with at least one subscription
    pub fn list_topics(&self) -> Vec<String> {
        let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
        topics
            .iter()
            .filter(|(_, subs)| !subs.is_empty())
            .map(|(topic, _)| topic.clone())
            .collect()
    }
}

impl EventBus for LocalEventBus {
    fn subscribe(&self, topic: &str, handler: Arc<dyn EventHandler>) -> Result<SubscriptionId> {
        if topic.is_empty() {
            return Err(Error::event_bus("Topic cannot be empty"));
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        topics
            .entry(topic.to_string())
            .or_default()
            .push(Subscription { id, handler });

        debug!(topic, subscription = %id, "Subscribed handler");
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);

        for subs in topics.values_mut() {
            if let Some(pos) = subs.iter().position(|sub| sub.id == id) {
                subs.remove(pos);
                debug!(subscription = %id, "Unsubscribed handler");
                return Ok(());
            }
        }

        Err(Error::event_bus(format!("Unknown subscription: {}", id)))
    }

    fn publish(&self, topic: &str, id: i32, payload: &[u8]) -> Result<usize> {
        let handlers: Vec<Arc<dyn EventHandler>> = {
            let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
            match topics.get(topic) {
                Some(subs) => subs.iter().map(|sub| Arc::clone(&sub.handler)).collect(),
                None => Vec::new(),
            }
        };

        let event = DataEvent { topic, id, payload };
        for handler in &handlers {
            handler.handle(&event);
        }

        trace!(topic, id, handlers = handlers.len(), "Published event");
        Ok(handlers.len())
    }
}
