mod flag_store;
mod positioning_backend;
mod resolution_host;
mod subscriber;

pub use flag_store::ResolutionFlagStore;
pub use positioning_backend::{PositioningBackend, ReadingStream};
pub use resolution_host::{ResolutionHandle, ResolutionHost};
pub use subscriber::LocationSubscriber;
