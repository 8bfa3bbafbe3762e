//! Application Layer
//!
//! The location acquisition use case: the public service façade, the
//! connection state machine it drives and the durable resolution flag.

mod acquisition_service;
mod connection_machine;
mod resolution_state;

pub use acquisition_service::{LocationService, WeakLocationService};
pub use connection_machine::{BackendEvent, ConnectionMachine};
pub use resolution_state::{ResolutionState, DEFAULT_RESOLUTION_KEY};
