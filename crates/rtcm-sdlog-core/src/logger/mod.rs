//! Core SD logger
//!
//! The logger is responsible for:
//! - Mounting storage once at init and remembering whether that worked
//! - Holding the runtime enabled/disabled flag
//! - Lazily opening today's file and rotating it after midnight
//! - Appending incoming bytes verbatim to the open file
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐        ┌───────────────────┐        ┌──────────────┐
//! │  EventBus   │──────▶ │ SerialDataHandler │──────▶ │  LoggerCore  │
//! │ (serial rx) │        │ (is_active gate)  │ write  │ (one Mutex)  │
//! └─────────────┘        └───────────────────┘        └──────────────┘
//!                                                             │
//!                       ┌─────────────┐               ┌──────────────┐
//!                       │ ConfigStore │── init flag ─▶│    Volume    │
//!                       └─────────────┘               │ YYYYMMDD.rtcm│
//!                                                     └──────────────┘
//! ```
//!
//! ## Write Path
//!
//! 1. Not mounted: nothing to do
//! 2. No file open: open today's file, but only while logging is enabled
//! 3. Open file without a day boundary: take today's midnight
//! 4. Boundary crossed (24h since `day_start`): close, open the new day's file
//! 5. Append the bytes
//!
//! Every failure on that path is logged and swallowed. Logging must never
//! destabilize the data forwarding it is attached to.

pub mod handler;
pub mod naming;

pub use handler::SerialDataHandler;

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::config::LoggerConfig;
use crate::error::Result;
use crate::traits::{Clock, ConfigStore, EventBus, LogFile, MountAdapter, SubscriptionId, SystemClock, Volume};

/// What a single write call did
///
/// Informational only: none of these are errors for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// All bytes were handed to the file
    Written { bytes: usize },
    /// No storage mounted
    NotMounted,
    /// No file open and logging disabled, so none was opened
    Disabled,
    /// The file could not be opened (or reopened after rotation); data dropped
    NoFile,
    /// The file rejected some of the bytes; it stays open
    Failed,
}

/// Result of the lazy open/rotate transition that precedes every write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileReadiness {
    /// A file for the current day is open
    Ready,
    /// No storage mounted
    NotMounted,
    /// No file open and logging disabled
    Disabled,
    /// Opening failed; retried on the next write
    Unavailable,
}

/// Point-in-time view of the logger state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggerStatus {
    /// Logging enabled and storage mounted
    pub active: bool,
    /// Runtime enabled flag
    pub logging_enabled: bool,
    /// Storage mounted at init
    pub card_mounted: bool,
    /// Path of the open file, if any
    pub current_file: Option<PathBuf>,
    /// Bytes appended to the open file since it was opened
    pub bytes_written: u64,
    /// Midnight that starts the current file's day
    pub day_start: Option<DateTime<Utc>>,
}

/// The currently open output file
struct OpenFile {
    path: PathBuf,
    handle: LogFile,
    bytes_written: u64,
}

/// Logger state machine
///
/// One instance owns the mount, the enabled flag, the open file and the
/// rotation boundary. It does no locking of its own; share it through
/// [`SdLogger`], whose mutex serializes `write` and `set_active`.
///
/// ## Invariants
///
/// - A file is open only while storage is mounted
/// - At most one file is open; rotation closes before it opens
/// - `day_start` is set whenever a file is open
pub struct LoggerCore<C: Clock = SystemClock> {
    /// Static settings
    settings: LoggerConfig,

    /// Source of "now" for `write`
    clock: C,

    /// Kept after init so shutdown can unmount
    mount_adapter: Option<Box<dyn MountAdapter>>,

    /// Mounted storage; `Some` iff the card is mounted
    volume: Option<Box<dyn Volume>>,

    /// Runtime toggle, independent of the mount
    logging_enabled: bool,

    /// Currently open output file
    file: Option<OpenFile>,

    /// Midnight of the day the current (or last attempted) file belongs to
    day_start: Option<DateTime<Utc>>,
}

impl<C: Clock> LoggerCore<C> {
    /// Create an uninitialized logger: not mounted, disabled, no file
    pub fn new(settings: LoggerConfig, clock: C) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            settings,
            clock,
            mount_adapter: None,
            volume: None,
            logging_enabled: false,
            file: None,
            day_start: None,
        })
    }

    /// One-time initialization
    ///
    /// Reads the enabled flag (absent or unreadable means disabled), then
    /// mounts storage regardless of it so that logging can be enabled later
    /// without a restart. When both succeed today's file is opened right away.
    ///
    /// A failed mount is final for the lifetime of this instance; there is no
    /// hot-plug path.
    pub fn init(&mut self, store: &dyn ConfigStore, mut mount_adapter: Box<dyn MountAdapter>) {
        if self.mount_adapter.is_some() {
            warn!("SD logger already initialized, ignoring repeated init");
            return;
        }

        self.logging_enabled = match store.get_bool(&self.settings.active_key) {
            Ok(value) => value.unwrap_or(false),
            Err(e) => {
                warn!(key = %self.settings.active_key, error = %e,
                      "Failed to read SD logging flag, defaulting to disabled");
                false
            }
        };
        info!(
            "Initial SD logging state from config: {}",
            if self.logging_enabled { "enabled" } else { "disabled" }
        );

        match mount_adapter.mount(&self.settings.mount) {
            Ok(volume) => {
                info!(mount_point = %volume.mount_point().display(), "SD card mounted successfully");
                self.volume = Some(volume);
            }
            Err(e) => {
                error!(mount_point = %self.settings.mount.mount_point.display(), error = %e,
                       "Failed to mount SD card, SD logging will be unavailable");
            }
        }
        self.mount_adapter = Some(mount_adapter);

        if self.volume.is_some() && self.logging_enabled {
            let now = self.clock.now();
            // Failure is logged inside and retried by the next write.
            let _ = self.open_current_day_file(&now);
        }
    }

    /// Set the runtime enabled flag
    ///
    /// Does not open or close files; the next write does that.
    pub fn set_active(&mut self, active: bool) {
        self.logging_enabled = active;
        info!("SD logging {}", if active { "enabled" } else { "disabled" });
    }

    /// Logging enabled and storage mounted
    pub fn is_active(&self) -> bool {
        self.logging_enabled && self.is_card_mounted()
    }

    /// Storage was mounted at init (and not unmounted since)
    pub fn is_card_mounted(&self) -> bool {
        self.volume.is_some()
    }

    /// Path of the open file, if any
    pub fn current_file(&self) -> Option<&PathBuf> {
        self.file.as_ref().map(|file| &file.path)
    }

    /// Midnight that starts the current file's day
    pub fn day_start(&self) -> Option<DateTime<Utc>> {
        self.day_start
    }

    /// Snapshot of the logger state
    pub fn status(&self) -> LoggerStatus {
        LoggerStatus {
            active: self.is_active(),
            logging_enabled: self.logging_enabled,
            card_mounted: self.is_card_mounted(),
            current_file: self.current_file().cloned(),
            bytes_written: self.file.as_ref().map_or(0, |file| file.bytes_written),
            day_start: self.day_start,
        }
    }

    /// Append `data` to today's file, using the injected clock
    pub fn write(&mut self, data: &[u8]) -> WriteOutcome {
        let now = self.clock.now();
        self.write_at(data, &now)
    }

    /// Append `data` as if the current time were `now`
    pub fn write_at<Tz: TimeZone>(&mut self, data: &[u8], now: &DateTime<Tz>) -> WriteOutcome {
        match self.prepare_file(now) {
            FileReadiness::Ready => {}
            FileReadiness::NotMounted => return WriteOutcome::NotMounted,
            FileReadiness::Disabled => return WriteOutcome::Disabled,
            FileReadiness::Unavailable => return WriteOutcome::NoFile,
        }

        let Some(file) = self.file.as_mut() else {
            warn!("Cannot write to SD: log file became unavailable before write");
            return WriteOutcome::NoFile;
        };

        // One write call per chunk; a short count is reported, not retried.
        let written = match file.handle.write(data) {
            Ok(written) => written,
            Err(e) => {
                error!(path = %file.path.display(), requested = data.len(), error = %e,
                       "Failed writing SD");
                return WriteOutcome::Failed;
            }
        };
        file.bytes_written += written as u64;

        if written < data.len() {
            let e = crate::Error::write(format!(
                "short write: {} of {} bytes",
                written,
                data.len()
            ));
            error!(path = %file.path.display(), requested = data.len(), written, error = %e,
                   "Failed writing SD");
            return WriteOutcome::Failed;
        }

        trace!(path = %file.path.display(), bytes = written, "Appended to log file");
        WriteOutcome::Written { bytes: written }
    }

    /// Lazy open/rotate transition run at the top of every write
    ///
    /// Opens a file only while logging is enabled, fills in a missing
    /// `day_start`, and rotates once 24 hours have passed since it.
    pub fn prepare_file<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> FileReadiness {
        if self.volume.is_none() {
            return FileReadiness::NotMounted;
        }

        if self.file.is_none() {
            if !self.logging_enabled {
                return FileReadiness::Disabled;
            }

            info!("Log file not open, attempting to open for write operation");
            if self.open_current_day_file(now).is_err() {
                warn!("Cannot write to SD: log file is not open even after attempt");
                return FileReadiness::Unavailable;
            }
        }

        if self.day_start.is_none() {
            self.day_start = Some(naming::day_start(now));
            info!("day_start initialized during write operation");
        }

        if let Some(start) = self.day_start
            && naming::rotation_due(&start, now)
        {
            info!("Midnight passed, rotating log file");
            self.close_file();
            if self.open_current_day_file(now).is_err() {
                error!("Failed to open new log file after midnight, SD logging paused until a file can be opened");
                return FileReadiness::Unavailable;
            }
        }

        FileReadiness::Ready
    }

    /// Close the file and unmount storage
    ///
    /// Afterwards the logger behaves as if the mount had failed. Calling it
    /// again is a no-op.
    pub fn shutdown(&mut self) {
        self.close_file();

        if let Some(volume) = self.volume.take() {
            let mount_point = volume.mount_point().display().to_string();
            match self.mount_adapter.as_mut() {
                Some(adapter) => match adapter.unmount(volume) {
                    Ok(()) => info!(mount_point = %mount_point, "SD card unmounted"),
                    Err(e) => error!(mount_point = %mount_point, error = %e, "Failed to unmount SD card"),
                },
                None => drop(volume),
            }
        }
    }

    /// Open (append mode) the file for the local day containing `now`
    ///
    /// `day_start` moves to that day even when opening fails, so the
    /// rotation check works once a file eventually opens.
    fn open_current_day_file<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Result<()> {
        self.close_file();

        let Some(volume) = self.volume.as_ref() else {
            return Err(crate::Error::storage("no volume mounted"));
        };

        self.day_start = Some(naming::day_start(now));

        let file_name = naming::day_file_name(now, &self.settings.file_extension);
        let path = volume.mount_point().join(&file_name);

        match volume.open_append(&file_name) {
            Ok(handle) => {
                info!(path = %path.display(), "Opened log file");
                self.file = Some(OpenFile {
                    path,
                    handle,
                    bytes_written: 0,
                });
                Ok(())
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Could not open log file");
                Err(e)
            }
        }
    }

    fn close_file(&mut self) {
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.handle.flush() {
                warn!(path = %file.path.display(), error = %e, "Failed to flush log file on close");
            }
            debug!(path = %file.path.display(), bytes = file.bytes_written, "Closed log file");
        }
    }
}

/// Cloneable, thread-safe handle to a [`LoggerCore`]
///
/// The mutex around the core is the single serialization point required when
/// the event bus delivers from more than one thread. A poisoned lock is
/// recovered rather than propagated.
pub struct SdLogger<C: Clock = SystemClock> {
    core: Arc<Mutex<LoggerCore<C>>>,
}

impl<C: Clock> Clone for SdLogger<C> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<C: Clock> SdLogger<C> {
    /// Wrap an existing core without touching any event bus
    pub fn new(core: LoggerCore<C>) -> Self {
        Self {
            core: Arc::new(Mutex::new(core)),
        }
    }

    /// Build, initialize and subscribe a logger
    ///
    /// # Parameters
    ///
    /// - `settings`: Static logger settings
    /// - `store`: Config store holding the persisted enabled flag
    /// - `mount_adapter`: Storage mount adapter
    /// - `bus`: Event bus carrying serial data
    /// - `clock`: Time source
    ///
    /// # Returns
    ///
    /// A tuple of (logger, subscription) where subscription identifies the
    /// data handler registered on `bus`. The handler is registered whether or
    /// not the mount succeeded or logging is enabled.
    ///
    /// Only invalid settings and a failed subscription are errors. After a
    /// failed subscription the file is closed and storage unmounted again.
    pub fn init(
        settings: LoggerConfig,
        store: &dyn ConfigStore,
        mount_adapter: Box<dyn MountAdapter>,
        bus: &dyn EventBus,
        clock: C,
    ) -> Result<(Self, SubscriptionId)> {
        let topic = settings.topic.clone();

        let mut core = LoggerCore::new(settings, clock)?;
        core.init(store, mount_adapter);
        let logger = Self::new(core);

        let handler = Arc::new(SerialDataHandler::new(logger.clone(), topic.clone()));
        let subscription = match bus.subscribe(&topic, handler) {
            Ok(subscription) => subscription,
            Err(e) => {
                logger.shutdown();
                return Err(e);
            }
        };
        info!(topic = %topic, subscription = %subscription,
              "Registered serial data handler for SD logging");

        Ok((logger, subscription))
    }

    /// See [`LoggerCore::write`]
    pub fn write(&self, data: &[u8]) -> WriteOutcome {
        self.lock().write(data)
    }

    /// See [`LoggerCore::set_active`]
    pub fn set_active(&self, active: bool) {
        self.lock().set_active(active);
    }

    /// See [`LoggerCore::is_active`]
    pub fn is_active(&self) -> bool {
        self.lock().is_active()
    }

    /// See [`LoggerCore::is_card_mounted`]
    pub fn is_card_mounted(&self) -> bool {
        self.lock().is_card_mounted()
    }

    /// See [`LoggerCore::status`]
    pub fn status(&self) -> LoggerStatus {
        self.lock().status()
    }

    /// See [`LoggerCore::shutdown`]
    pub fn shutdown(&self) {
        self.lock().shutdown();
    }

    /// Run `f` with exclusive access to the core
    pub fn with_core<R>(&self, f: impl FnOnce(&mut LoggerCore<C>) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, LoggerCore<C>> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
