//! Positioning Backend Port
//!
//! Defines the interface to the external positioning service: connection
//! lifecycle, configuration checks and the reading stream.

use crate::domain::entities::Reading;
use crate::domain::value_objects::{ConfigurationStatus, ConnectOutcome, LocationRequest};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Stream of readings pushed by the backend while subscribed.
///
/// Dropping the receiver ends the subscription on the consumer side.
pub type ReadingStream = mpsc::Receiver<Reading>;

/// Connection to the external positioning service.
///
/// This is an outbound port. The connection state machine owns the only
/// handle and calls it from the service event loop; implementations never
/// report failures by panicking, every outcome is a typed value.
#[async_trait]
pub trait PositioningBackend: Send + Sync {
    /// Open the connection.
    async fn connect(&self) -> ConnectOutcome;

    /// Release the connection. Also aborts an attempt still in flight.
    async fn disconnect(&self);

    /// Ask whether ambient settings can satisfy `request`.
    async fn check_configuration(&self, request: &LocationRequest) -> ConfigurationStatus;

    /// Start pushing readings at the cadence of `request`.
    async fn subscribe_readings(&self, request: &LocationRequest) -> ReadingStream;

    /// Stop pushing readings.
    async fn unsubscribe_readings(&self);

    /// The most recent reading the backend already holds, if any.
    async fn last_known_reading(&self) -> Option<Reading>;
}
