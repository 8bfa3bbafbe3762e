//! geofix Library
//!
//! Location acquisition over a pluggable positioning backend: connection
//! lifecycle, user-driven resolution of recoverable failures, and delivery
//! of readings under a TRACK / ONE_SHOT / NEVER policy.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{LocationService, WeakLocationService, DEFAULT_RESOLUTION_KEY};
pub use config::{load_config, ConfigError, ServiceConfig};
pub use domain::entities::{Coordinate, Reading};
pub use domain::ports::{
    LocationSubscriber, PositioningBackend, ReadingStream, ResolutionFlagStore, ResolutionHandle,
    ResolutionHost,
};
pub use domain::services::GeoMath;
pub use domain::value_objects::{
    ConfigurationStatus, ConnectOutcome, ConnectionState, DeliveryPolicy, LocationRequest,
    Priority, ResolutionProblem,
};
pub use error::{AcquisitionFailure, LocationError, ResolutionLaunchError, StoreError};
