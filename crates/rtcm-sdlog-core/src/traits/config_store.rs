// # Config Store Trait
//
// Defines the interface to the persistent configuration store.
//
// The logger reads exactly one value from it: the persisted "logging
// enabled" flag, once, at init. Hosts that let users toggle logging also
// write the flag back so the choice survives a restart.
//
// ## Implementations
//
// - In-memory: `MemoryConfigStore`
// - JSON file with atomic writes: `FileConfigStore`

/// Trait for config store implementations
///
/// Implementations must be thread-safe.
pub trait ConfigStore: Send + Sync {
    /// Read a boolean setting
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bool))`: The stored value
    /// - `Ok(None)`: Key absent (or not interpretable as a boolean)
    /// - `Err(Error)`: Storage error
    fn get_bool(&self, key: &str) -> Result<Option<bool>, crate::Error>;

    /// Store a boolean setting
    fn set_bool(&self, key: &str, value: bool) -> Result<(), crate::Error>;

    /// Persist any pending changes
    fn flush(&self) -> Result<(), crate::Error>;
}
