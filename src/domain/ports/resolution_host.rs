//! Resolution Host Port
//!
//! A UI host able to walk the user through fixing a recoverable problem.

use crate::domain::value_objects::ResolutionProblem;
use crate::error::ResolutionLaunchError;
use std::sync::Arc;

/// A UI host that can start a resolution flow.
///
/// Once `start_resolution` returns `Ok`, the host owes the service exactly
/// one call to `LocationService::handle_resolution_outcome`.
pub trait ResolutionHost: Send + Sync {
    fn start_resolution(&self, problem: &ResolutionProblem) -> Result<(), ResolutionLaunchError>;

    /// Take over a flow that an earlier host started but never reported.
    ///
    /// `Ok` carries the same debt as `start_resolution`. The default declines,
    /// and the service then drops the leftover flag and connects afresh.
    fn resume_resolution(&self) -> Result<(), ResolutionLaunchError> {
        Err(ResolutionLaunchError(
            "host cannot resume a flow started by an earlier host".to_string(),
        ))
    }
}

/// Handle returned by a subscriber when a resolution is required.
pub type ResolutionHandle = Arc<dyn ResolutionHost>;
