// # Memory Config Store
//
// In-memory implementation of ConfigStore.
//
// Nothing survives a restart. Useful for tests and for hosts that pass the
// initial enabled flag on the command line or environment.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use crate::Error;
use crate::traits::ConfigStore;

/// In-memory config store implementation
///
/// # Example
///
/// ```rust
/// use rtcm_sdlog_core::store::MemoryConfigStore;
/// use rtcm_sdlog_core::traits::ConfigStore;
///
/// let store = MemoryConfigStore::new();
/// assert_eq!(store.get_bool("sd_log_active").unwrap(), None);
///
/// store.set_bool("sd_log_active", true).unwrap();
/// assert_eq!(store.get_bool("sd_log_active").unwrap(), Some(true));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryConfigStore {
    /// Create a new empty memory config store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an arbitrary JSON value
    pub fn set_value(&self, key: impl Into<String>, value: Value) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value);
    }

    /// Get the number of keys in the store
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>, Error> {
        let values = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).and_then(super::value_as_bool))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), Error> {
        self.set_value(key, Value::Bool(value));
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        // No-op for memory store
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_basic() {
        let store = MemoryConfigStore::new();
        assert!(store.is_empty());

        store.set_bool("sd_log_active", false).unwrap();
        assert_eq!(store.get_bool("sd_log_active").unwrap(), Some(false));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_store_clone_shares_state() {
        let store = MemoryConfigStore::new();
        let other = store.clone();

        other.set_value("sd_log_active", serde_json::json!(1));

        assert_eq!(store.get_bool("sd_log_active").unwrap(), Some(true));
    }
}
