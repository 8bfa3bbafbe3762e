//! DashMap Flag Store
//!
//! Implements ResolutionFlagStore in memory using DashMap. Flags survive UI
//! host recreation within one process, not a process restart.

use crate::domain::ports::ResolutionFlagStore;
use crate::error::StoreError;
use dashmap::DashMap;
use std::sync::Arc;

/// DashMap-backed resolution flag store.
#[derive(Clone)]
pub struct DashMapFlagStore {
    flags: Arc<DashMap<String, bool>>,
}

impl DashMapFlagStore {
    pub fn new() -> Self {
        Self {
            flags: Arc::new(DashMap::new()),
        }
    }

    /// Number of keys with a record.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

impl Default for DashMapFlagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionFlagStore for DashMapFlagStore {
    fn get(&self, key: &str) -> Result<Option<bool>, StoreError> {
        Ok(self.flags.get(key).map(|e| *e.value()))
    }

    fn set(&self, key: &str, value: bool) -> Result<(), StoreError> {
        self.flags.insert(key.to_string(), value);
        Ok(())
    }
}
