//! Domain Layer
//!
//! Location types, the connection transition table, distance math and the
//! outbound ports the application layer drives.

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{Coordinate, Reading};
pub use value_objects::{
    ConfigurationStatus, ConnectOutcome, ConnectionState, DeliveryPolicy, LocationRequest,
    Priority, ResolutionProblem, Trigger,
};
