// # Config Store Implementations
//
// This module provides implementations of the ConfigStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileConfigStore;
pub use memory::MemoryConfigStore;

use serde_json::Value;

/// Interpret a stored value as a boolean
///
/// Accepts JSON booleans, integers (non-zero is true) and the strings
/// "true"/"false"/"1"/"0". Anything else reads as absent.
pub(crate) fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0).or_else(|| n.as_u64().map(|u| u != 0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
