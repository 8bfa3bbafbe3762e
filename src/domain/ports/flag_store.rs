//! Resolution Flag Store Port
//!
//! Defines the durable key-value store that remembers a resolution flow is in
//! progress across UI host lifetimes.

use crate::error::StoreError;

/// Durable boolean flags keyed by a fixed identifier.
///
/// Only one active service may write a given key at a time. This is a
/// documented precondition, not enforced with locks.
pub trait ResolutionFlagStore: Send + Sync {
    /// Read a flag. `Ok(None)` means no record exists for `key`.
    fn get(&self, key: &str) -> Result<Option<bool>, StoreError>;

    /// Write a flag, creating the record when missing.
    fn set(&self, key: &str, value: bool) -> Result<(), StoreError>;
}
