// # Event Bus Trait
//
// Defines the publish/subscribe transport between the serial-input
// subsystem and its consumers.
//
// ## Delivery Model
//
// - Synchronous: `publish` runs every handler on the publisher's thread
//   before returning
// - Wildcard IDs: a subscription matches every event ID of its topic
// - Borrowed payloads: handlers see the payload only for the duration of
//   the call and must copy what they want to keep
//
// For serial data-arrival notifications the event ID is the payload length.

use std::fmt;
use std::sync::Arc;

/// A notification as seen by a handler
#[derive(Debug, Clone, Copy)]
pub struct DataEvent<'a> {
    /// Topic the event was published on
    pub topic: &'a str,
    /// Event ID (the payload length for serial data)
    pub id: i32,
    /// Payload, valid only while the handler runs
    pub payload: &'a [u8],
}

/// Callback registered on an [`EventBus`]
pub trait EventHandler: Send + Sync {
    /// Handle one event
    ///
    /// Must not fail visibly and must not retain `event.payload`.
    fn handle(&self, event: &DataEvent<'_>);
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Trait for event bus implementations
pub trait EventBus: Send + Sync {
    /// Register `handler` for every event ID on `topic`
    fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<SubscriptionId, crate::Error>;

    /// Remove a subscription
    ///
    /// Unknown IDs are an error.
    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), crate::Error>;

    /// Deliver an event to all handlers of `topic`, synchronously
    ///
    /// # Returns
    ///
    /// The number of handlers invoked
    fn publish(&self, topic: &str, id: i32, payload: &[u8]) -> Result<usize, crate::Error>;
}
