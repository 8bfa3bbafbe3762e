mod dashmap_flag_store;
mod simulated_backend;
mod sqlite_flag_store;

pub use dashmap_flag_store::DashMapFlagStore;
pub use simulated_backend::{Scenario, SimulatedBackend};
pub use sqlite_flag_store::SqliteFlagStore;
