//! Event bus adapter for serial data
//!
//! Turns data-arrival notifications into logger writes. Serial events carry
//! the payload length as their event ID; the payload is borrowed from the
//! publisher and is fully consumed before `handle` returns.

use tracing::{debug, trace};

use super::SdLogger;
use crate::traits::{Clock, DataEvent, EventHandler, SystemClock};

/// Event bus callback feeding an [`SdLogger`]
///
/// Stateless apart from the logger handle: whether to log is decided per
/// event, so the subscription can exist while logging is off or the card is
/// missing.
pub struct SerialDataHandler<C: Clock = SystemClock> {
    logger: SdLogger<C>,
    topic: String,
}

impl<C: Clock> SerialDataHandler<C> {
    /// Create a handler for events on `topic`
    pub fn new(logger: SdLogger<C>, topic: impl Into<String>) -> Self {
        Self {
            logger,
            topic: topic.into(),
        }
    }
}

impl<C: Clock> EventHandler for SerialDataHandler<C> {
    fn handle(&self, event: &DataEvent<'_>) {
        if event.topic != self.topic {
            return;
        }

        let Ok(length) = usize::try_from(event.id) else {
            debug!(id = event.id, "Ignoring serial event with negative length");
            return;
        };
        let data = &event.payload[..length.min(event.payload.len())];

        // Gate and write under one lock.
        self.logger.with_core(|core| {
            if core.is_active() {
                let outcome = core.write(data);
                trace!(?outcome, bytes = data.len(), "Serial data forwarded to SD logger");
            }
        });
    }
}
