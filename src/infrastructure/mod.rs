//! Infrastructure Layer
//!
//! Process-level concerns for the binary.

pub mod shutdown;

pub use shutdown::{graceful_stop, shutdown_signal, ShutdownSignal};
