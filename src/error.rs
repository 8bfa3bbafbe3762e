//! Error types for the location service and its collaborators.

use crate::domain::value_objects::ResolutionProblem;

/// Errors returned synchronously by the [`LocationService`](crate::LocationService) façade.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// No reading has been cached since the service was built.
    #[error("no location available yet")]
    NoLocationAvailable,
    /// The service event loop has exited.
    #[error("location service is no longer running")]
    ServiceClosed,
}

/// Reasons handed to `LocationSubscriber::on_acquisition_failed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcquisitionFailure {
    #[error("positioning backend connection failed: {0}")]
    ConnectionFailed(String),
    #[error("no resolution host available for: {0}")]
    ResolutionUnavailable(ResolutionProblem),
    #[error("resolution flow could not be started for: {0}")]
    ResolutionLaunchFailed(ResolutionProblem),
    #[error("location settings are insufficient: {0}")]
    SettingsInsufficient(ResolutionProblem),
    #[error("location settings cannot satisfy the request: {0}")]
    SettingsUnavailable(String),
}

/// Durable flag store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("flag store unavailable: {0}")]
    Unavailable(String),
    #[error("flag store query failed: {0}")]
    Query(String),
}

/// A resolution host could not start its UI flow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to launch resolution flow: {0}")]
pub struct ResolutionLaunchError(pub String);
