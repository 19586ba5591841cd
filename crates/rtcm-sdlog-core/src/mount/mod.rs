// # Mount Adapter Implementations
//
// This module provides implementations of the MountAdapter trait.

pub mod directory;

pub use directory::{DirectoryMount, DirectoryVolume};
