//! Location Subscriber Port
//!
//! The consumer registered with the service for one acquisition request.

use crate::domain::entities::Reading;
use crate::domain::ports::ResolutionHandle;
use crate::error::AcquisitionFailure;

/// Receives readings and failure notices from the service.
///
/// Callbacks run on the service event loop and must not block.
pub trait LocationSubscriber: Send + Sync {
    /// A reading passed the delivery policy.
    fn on_reading(&self, reading: &Reading);

    /// A recoverable problem needs the user, or a flow left pending by an
    /// earlier host needs someone to answer for it. Return `None` when no UI
    /// is available; a new problem is then treated as fatal and a leftover
    /// flow is dropped.
    fn on_resolution_required(&self) -> Option<ResolutionHandle>;

    /// Acquisition failed and will not be retried.
    fn on_acquisition_failed(&self, failure: &AcquisitionFailure);
}
