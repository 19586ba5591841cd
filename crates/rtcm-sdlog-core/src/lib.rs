// # rtcm-sdlog-core
//
// Core library for the rotating RTCM SD card logger.
//
// ## Architecture Overview
//
// The logger durably records a continuous byte stream (RTCM corrections read
// from a serial port) into one file per calendar day on removable storage:
// - **MountAdapter**: Trait for making block storage available as a filesystem
// - **ConfigStore**: Trait for the persistent key/value settings store
// - **EventBus**: Trait for the synchronous publish/subscribe transport
// - **LoggerCore**: Mount/enable/file/rotation state machine
// - **SdLogger**: Shared handle that serializes access to the core
// - **SerialDataHandler**: Event bus callback that forwards data to the logger
//
// ## Design Principles
//
// 1. **Never destabilize the data path**: logging failures are logged, not returned
// 2. **Lazy work**: files are opened and rotated on write, never on a timer
// 3. **Explicit state**: one state struct, one lock, no hidden globals
// 4. **Library-First**: the daemon only wires concrete collaborators together

pub mod traits;
pub mod logger;
pub mod bus;
pub mod mount;
pub mod store;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{Clock, ConfigStore, EventBus, EventHandler, MountAdapter, SystemClock, Volume};
pub use logger::{FileReadiness, LoggerCore, LoggerStatus, SdLogger, SerialDataHandler, WriteOutcome};
pub use bus::LocalEventBus;
pub use mount::{DirectoryMount, DirectoryVolume};
pub use store::{FileConfigStore, MemoryConfigStore};
pub use config::{LoggerConfig, MountConfig};
pub use error::{Error, Result};
