//! Configuration types for the SD logger
//!
//! These are the static settings of a logger instance. The runtime
//! enabled/disabled flag is not part of them: it lives in the
//! [`ConfigStore`](crate::ConfigStore) under [`LoggerConfig::active_key`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main logger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Storage mount settings
    #[serde(default)]
    pub mount: MountConfig,

    /// Extension of the daily files (`YYYYMMDD.<ext>`)
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// Config store key holding the persisted enabled flag
    #[serde(default = "default_active_key")]
    pub active_key: String,

    /// Event bus topic carrying serial data-arrival notifications
    #[serde(default = "default_topic")]
    pub topic: String,
}

impl LoggerConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            mount: MountConfig::default(),
            file_extension: default_file_extension(),
            active_key: default_active_key(),
            topic: default_topic(),
        }
    }

    /// Set the mount point
    pub fn with_mount_point(mut self, mount_point: impl Into<PathBuf>) -> Self {
        self.mount.mount_point = mount_point.into();
        self
    }

    /// Set the file extension
    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.mount.validate()?;

        if self.file_extension.is_empty() {
            return Err(crate::Error::config("File extension cannot be empty"));
        }
        if self
            .file_extension
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '.')
        {
            return Err(crate::Error::config(format!(
                "File extension '{}' must not contain '.', '/' or '\\'",
                self.file_extension
            )));
        }
        if self.active_key.is_empty() {
            return Err(crate::Error::config("Active flag key cannot be empty"));
        }
        if self.topic.is_empty() {
            return Err(crate::Error::config("Data topic cannot be empty"));
        }

        Ok(())
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage mount configuration, handed to the [`MountAdapter`](crate::MountAdapter)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Where the storage is made available
    #[serde(default = "default_mount_point")]
    pub mount_point: PathBuf,

    /// Maximum number of concurrently open files on the volume
    ///
    /// The logger itself never holds more than one.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Create the mount point when it does not exist instead of failing
    #[serde(default)]
    pub create_mount_point: bool,
}

impl MountConfig {
    /// Validate the mount configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.mount_point.as_os_str().is_empty() {
            return Err(crate::Error::config("Mount point cannot be empty"));
        }
        if self.max_files == 0 {
            return Err(crate::Error::config("max_files must be at least 1"));
        }
        Ok(())
    }
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            mount_point: default_mount_point(),
            max_files: default_max_files(),
            create_mount_point: false,
        }
    }
}

fn default_mount_point() -> PathBuf {
    PathBuf::from("/sdcard")
}

fn default_max_files() -> usize {
    3
}

fn default_file_extension() -> String {
    "rtcm".to_string()
}

fn default_active_key() -> String {
    "sd_log_active".to_string()
}

fn default_topic() -> String {
    "serial.read".to_string()
}
