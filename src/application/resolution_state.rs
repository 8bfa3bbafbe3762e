//! Resolution State
//!
//! Durable "a resolution flow is in progress" flag, backed by a
//! caller-supplied store so it outlives the UI host that started the flow.

use crate::domain::ports::ResolutionFlagStore;
use std::sync::Arc;

/// Default key under which the flag is persisted.
pub const DEFAULT_RESOLUTION_KEY: &str = "location.resolving_error";

/// Idempotent view over a [`ResolutionFlagStore`].
///
/// Store failures never escape: reads degrade to "not resolving" and failed
/// writes are logged.
#[derive(Clone)]
pub struct ResolutionState {
    store: Arc<dyn ResolutionFlagStore>,
}

impl ResolutionState {
    pub fn new(store: Arc<dyn ResolutionFlagStore>) -> Self {
        Self { store }
    }

    /// Whether a resolution flow is recorded as in progress for `key`.
    ///
    /// A missing record means "not resolving".
    pub fn is_resolving(&self, key: &str) -> bool {
        match self.store.get(key) {
            Ok(value) => value.unwrap_or(false),
            Err(e) => {
                tracing::warn!("failed to read resolution flag {}: {}", key, e);
                false
            }
        }
    }

    pub fn set_resolving(&self, key: &str) {
        self.write(key, true);
    }

    pub fn clear_resolving(&self, key: &str) {
        self.write(key, false);
    }

    fn write(&self, key: &str, value: bool) {
        if let Err(e) = self.store.set(key, value) {
            tracing::warn!("failed to write resolution flag {}={}: {}", key, value, e);
        } else {
            tracing::debug!("resolution flag {}={}", key, value);
        }
    }
}
