// # Mount Adapter Trait
//
// Defines the interface to the storage/mount subsystem.
//
// ## Purpose
//
// The logger does not know how block storage is detected or which
// filesystem sits on it. It asks a `MountAdapter` to make the storage
// available once, at init, and from then on only opens files on the
// returned `Volume`.
//
// ## Implementations
//
// - Host directory: `DirectoryMount` in this crate
// - Test doubles: in-memory volumes with failure injection

use std::io::Write;
use std::path::Path;

use crate::config::MountConfig;

/// An open, append-mode file on a mounted volume
///
/// Dropping the handle closes the file.
pub type LogFile = Box<dyn Write + Send>;

/// Trait for mount adapter implementations
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Probe and mount block devices or host directories
/// - ✅ Fail fast when the storage is absent
///
/// ## Forbidden Capabilities
/// - ❌ Retry mounting in the background (there is no hot-plug path)
/// - ❌ Open log files (owned by `LoggerCore` through `Volume`)
/// - ❌ Decide whether logging is enabled
pub trait MountAdapter: Send {
    /// Make the storage described by `config` available
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn Volume>)`: The mounted volume
    /// - `Err(Error::Mount)`: Storage absent or unreadable
    fn mount(&mut self, config: &MountConfig) -> Result<Box<dyn Volume>, crate::Error>;

    /// Release a volume previously returned by [`mount`](Self::mount)
    ///
    /// All files opened on the volume must have been dropped first.
    fn unmount(&mut self, volume: Box<dyn Volume>) -> Result<(), crate::Error>;
}

/// A mounted volume
pub trait Volume: Send {
    /// Directory under which the volume's files are visible
    fn mount_point(&self) -> &Path;

    /// Open `file_name` (relative to the mount point) for appending
    ///
    /// The file is created if it does not exist; existing content is kept.
    ///
    /// # Returns
    ///
    /// - `Ok(LogFile)`: The open handle
    /// - `Err(Error::Open)`: Permissions, full filesystem, card removed, ...
    fn open_append(&self, file_name: &str) -> Result<LogFile, crate::Error>;
}
