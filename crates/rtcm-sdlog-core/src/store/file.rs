// # File Config Store
//
// File-based implementation of ConfigStore with crash recovery.
//
// ## Purpose
//
// Keeps settings such as the SD logging flag across restarts.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "values": {
//     "sd_log_active": true
//   }
// }
// ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde_json::Value;

use crate::Error;
use crate::traits::ConfigStore;

/// Config file format version
const CONFIG_FILE_VERSION: &str = "1.0";

/// File-based config store with crash recovery
///
/// Every `set_bool` is written through to disk immediately.
///
/// # Example
///
/// ```rust,no_run
/// use rtcm_sdlog_core::store::FileConfigStore;
/// use rtcm_sdlog_core::traits::ConfigStore;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileConfigStore::open("/var/lib/rtcm-sdlog/config.json")?;
///
///     store.set_bool("sd_log_active", true)?;
///     assert_eq!(store.get_bool("sd_log_active")?, Some(true));
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    state: RwLock<FileState>,
}

/// Internal state for file-based store
#[derive(Debug)]
struct FileState {
    values: BTreeMap<String, Value>,
    dirty: bool,
}

/// Serializable config file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct ConfigFileFormat {
    version: String,
    values: BTreeMap<String, Value>,
}

impl FileConfigStore {
    /// Create or load a file config store
    ///
    /// This will:
    /// 1. Try to load the existing config file
    /// 2. If it is corrupted, try to load the backup
    /// 3. If both fail, start with empty settings
    /// 4. Create parent directories if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                Error::config(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let values = Self::load_with_recovery(&path)?;

        Ok(Self {
            path,
            state: RwLock::new(FileState {
                values,
                dirty: false,
            }),
        })
    }

    /// Path of the config file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings with automatic recovery from the backup file
    fn load_with_recovery(path: &Path) -> Result<BTreeMap<String, Value>, Error> {
        match Self::load(path) {
            Ok(values) => {
                tracing::debug!("Loaded config from file: {} keys", values.len());
                Ok(values)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Config file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty config.");
                    return Ok(BTreeMap::new());
                }

                match Self::load(&backup_path) {
                    Ok(values) => {
                        tracing::info!("Recovered config from backup: {} keys", values.len());
                        if let Err(restore_err) = fs::copy(&backup_path, path) {
                            tracing::error!(
                                "Failed to restore config file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(values)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also corrupted: {}. Starting with empty config.",
                            backup_err
                        );
                        Ok(BTreeMap::new())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Load settings from `path`; a missing file is empty settings
    fn load(path: &Path) -> Result<BTreeMap<String, Value>, Error> {
        if !path.exists() {
            tracing::debug!("Config file does not exist: {}", path.display());
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            Error::config_store(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config_file: ConfigFileFormat = serde_json::from_str(&content)?;

        if config_file.version != CONFIG_FILE_VERSION {
            tracing::warn!(
                "Config file version mismatch: expected {}, got {}. \
                Attempting to load anyway.",
                CONFIG_FILE_VERSION,
                config_file.version
            );
        }

        Ok(config_file.values)
    }

    /// Write settings to file atomically
    fn write_state(&self) -> Result<(), Error> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let config_file = ConfigFileFormat {
            version: CONFIG_FILE_VERSION.to_string(),
            values: state.values.clone(),
        };
        let json = serde_json::to_string_pretty(&config_file)?;

        let temp_path = self.temp_path();
        {
            let mut file = File::create(&temp_path).map_err(|e| {
                Error::config_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes())
                .and_then(|()| file.sync_all())
                .map_err(|e| {
                    Error::config_store(format!(
                        "Failed to write temp file {}: {}",
                        temp_path.display(),
                        e
                    ))
                })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path) {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            Error::config_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        state.dirty = false;
        tracing::trace!("Config written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

impl ConfigStore for FileConfigStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>, Error> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.values.get(key).and_then(super::value_as_bool))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), Error> {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.values.insert(key.to_string(), Value::Bool(value));
            state.dirty = true;
        }

        // Immediate write for durability
        self.write_state()
    }

    fn flush(&self) -> Result<(), Error> {
        let dirty = self.state.read().unwrap_or_else(PoisonError::into_inner).dirty;
        if dirty { self.write_state() } else { Ok(()) }
    }
}
