//! Core traits for the SD logger
//!
//! This module defines the abstract interfaces to the logger's collaborators.
//!
//! - [`Clock`]: Source of the current local time
//! - [`MountAdapter`]: Mount/unmount removable storage
//! - [`ConfigStore`]: Persistent key/value settings
//! - [`EventBus`]: Synchronous publish/subscribe transport

pub mod clock;
pub mod mount;
pub mod config_store;
pub mod event_bus;

pub use clock::{Clock, SystemClock};
pub use mount::{LogFile, MountAdapter, Volume};
pub use config_store::ConfigStore;
pub use event_bus::{DataEvent, EventBus, EventHandler, SubscriptionId};
