//! Console Subscriber
//!
//! Inbound adapter for the `geofix` binary: prints every delivered reading,
//! with the distance travelled since the first fix, and auto-approves
//! resolution flows on behalf of a user.

use crate::application::{LocationService, WeakLocationService};
use crate::domain::entities::{Coordinate, Reading};
use crate::domain::ports::{LocationSubscriber, ResolutionHandle, ResolutionHost};
use crate::domain::services::GeoMath;
use crate::domain::value_objects::ResolutionProblem;
use crate::error::{AcquisitionFailure, ResolutionLaunchError};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

/// One printed line, also the JSON shape when JSON output is enabled.
#[derive(Debug, Clone, Serialize)]
pub struct ReadingReport {
    pub sequence: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub captured_at_ms: u128,
    pub distance_km: f64,
    pub distance_miles: f64,
}

impl ReadingReport {
    fn to_text(&self) -> String {
        format!(
            "#{} {:.6},{:.6} moved {:.3} km ({:.3} mi)",
            self.sequence, self.latitude, self.longitude, self.distance_km, self.distance_miles
        )
    }
}

fn json_line<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(line) => Some(line),
        Err(e) => {
            tracing::warn!("failed to serialize reading report: {}", e);
            None
        }
    }
}

/// Subscriber that logs readings and failures to the console.
pub struct ConsoleSubscriber {
    json: bool,
    origin: Mutex<Option<Coordinate>>,
    delivered: AtomicU64,
    host: Option<ResolutionHandle>,
    last_failure: Mutex<Option<AcquisitionFailure>>,
}

impl ConsoleSubscriber {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            origin: Mutex::new(None),
            delivered: AtomicU64::new(0),
            host: None,
            last_failure: Mutex::new(None),
        }
    }

    /// Answer resolution requests with `host`.
    pub fn with_resolution_host(mut self, host: ResolutionHandle) -> Self {
        self.host = Some(host);
        self
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn last_failure(&self) -> Option<AcquisitionFailure> {
        self.last_failure.lock().clone()
    }

    /// Build the report for `reading`, measuring from the first reading seen.
    pub fn report(&self, reading: &Reading) -> ReadingReport {
        let coordinate = reading.coordinate();
        let origin = *self.origin.lock().get_or_insert(coordinate);
        let sequence = self.delivered.fetch_add(1, Ordering::SeqCst) + 1;
        let captured_at_ms = reading
            .captured_at()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);

        ReadingReport {
            sequence,
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            captured_at_ms,
            distance_km: GeoMath::distance_km(&origin, &coordinate),
            distance_miles: GeoMath::distance_miles(&origin, &coordinate),
        }
    }
}

impl LocationSubscriber for ConsoleSubscriber {
    fn on_reading(&self, reading: &Reading) {
        let report = self.report(reading);
        if !self.json {
            tracing::info!("{}", report.to_text());
        } else if let Some(line) = json_line(&report) {
            println!("{}", line);
        }
    }

    fn on_resolution_required(&self) -> Option<ResolutionHandle> {
        if self.host.is_none() {
            tracing::warn!("resolution required but no resolution host is attached");
        }
        self.host.clone()
    }

    fn on_acquisition_failed(&self, failure: &AcquisitionFailure) {
        tracing::error!("location acquisition failed: {}", failure);
        *self.last_failure.lock() = Some(failure.clone());
    }
}

/// Resolution host that approves every flow after a short delay.
///
/// Stands in for a user tapping "OK" on a settings dialog. Holds only a weak
/// handle, so a subscriber carrying this host does not keep the service alive.
pub struct AutoApproveHost {
    service: WeakLocationService,
    delay: Duration,
    approve: bool,
}

impl AutoApproveHost {
    pub fn new(service: &LocationService, delay: Duration) -> Self {
        Self {
            service: service.downgrade(),
            delay,
            approve: true,
        }
    }

    /// Host that reports every flow as cancelled by the user.
    pub fn declining(service: &LocationService, delay: Duration) -> Self {
        Self {
            service: service.downgrade(),
            delay,
            approve: false,
        }
    }

    pub fn into_handle(self) -> ResolutionHandle {
        Arc::new(self)
    }
}

impl AutoApproveHost {
    /// Answer the flow after the delay.
    fn schedule(&self, what: &str) -> Result<(), ResolutionLaunchError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ResolutionLaunchError(e.to_string()))?;

        tracing::info!(
            "resolving {} (auto-{} in {:?})",
            what,
            if self.approve { "approve" } else { "decline" },
            self.delay
        );

        let service = self.service.clone();
        let delay = self.delay;
        let approve = self.approve;
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = service.handle_resolution_outcome(approve) {
                tracing::debug!("resolution outcome dropped: {}", e);
            }
        });

        Ok(())
    }
}

impl ResolutionHost for AutoApproveHost {
    fn start_resolution(&self, problem: &ResolutionProblem) -> Result<(), ResolutionLaunchError> {
        self.schedule(&format!("\"{}\"", problem))
    }

    /// The console stands in for the user, so it can answer for any flow.
    fn resume_resolution(&self) -> Result<(), ResolutionLaunchError> {
        self.schedule("a flow left pending by an earlier run")
    }
}
