//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use geofix::adapters::outbound::{DashMapFlagStore, SimulatedBackend};
use geofix::{
    AcquisitionFailure, Coordinate, LocationService, LocationSubscriber, Reading,
    ResolutionFlagStore, ResolutionHandle, ResolutionHost, ResolutionLaunchError,
    ResolutionProblem, ServiceConfig,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const KEY: &str = geofix::DEFAULT_RESOLUTION_KEY;

/// Resolution host that records every problem it was asked to resolve.
#[derive(Default)]
pub struct RecordingHost {
    pub problems: Mutex<Vec<ResolutionProblem>>,
    pub resumes: AtomicUsize,
    pub fail_launch: bool,
}

impl RecordingHost {
    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::default()
        }
    }

    pub fn launches(&self) -> usize {
        self.problems.lock().len()
    }

    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }
}

impl ResolutionHost for RecordingHost {
    fn start_resolution(&self, problem: &ResolutionProblem) -> Result<(), ResolutionLaunchError> {
        self.problems.lock().push(problem.clone());
        if self.fail_launch {
            return Err(ResolutionLaunchError("activity gone".into()));
        }
        Ok(())
    }

    fn resume_resolution(&self) -> Result<(), ResolutionLaunchError> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch {
            return Err(ResolutionLaunchError("activity gone".into()));
        }
        Ok(())
    }
}

/// Subscriber that records every callback.
#[derive(Default)]
pub struct Recorder {
    pub readings: Mutex<Vec<Reading>>,
    pub failures: Mutex<Vec<AcquisitionFailure>>,
    pub resolution_requests: AtomicUsize,
    pub host: Option<Arc<RecordingHost>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_host(host: Arc<RecordingHost>) -> Arc<Self> {
        Arc::new(Self {
            host: Some(host),
            ..Self::default()
        })
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.readings.lock().clone()
    }

    pub fn failures(&self) -> Vec<AcquisitionFailure> {
        self.failures.lock().clone()
    }

    pub fn resolution_requests(&self) -> usize {
        self.resolution_requests.load(Ordering::SeqCst)
    }
}

impl LocationSubscriber for Recorder {
    fn on_reading(&self, reading: &Reading) {
        self.readings.lock().push(*reading);
    }

    fn on_resolution_required(&self) -> Option<ResolutionHandle> {
        self.resolution_requests.fetch_add(1, Ordering::SeqCst);
        self.host.clone().map(|h| h as ResolutionHandle)
    }

    fn on_acquisition_failed(&self, failure: &AcquisitionFailure) {
        self.failures.lock().push(failure.clone());
    }
}

pub struct Harness {
    pub service: LocationService,
    pub backend: Arc<SimulatedBackend>,
    pub store: Arc<DashMapFlagStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let backend = Arc::new(SimulatedBackend::new(Coordinate::new(37.5665, 126.978)));
        let store = Arc::new(DashMapFlagStore::new());
        let service = LocationService::new(backend.clone(), store.clone(), config);
        Self {
            service,
            backend,
            store,
        }
    }

    pub fn flag(&self) -> Option<bool> {
        self.store.get(KEY).unwrap()
    }
}

/// A reading with a fixed timestamp, distinct per `n`.
pub fn reading(n: u64) -> Reading {
    Reading::new(
        Coordinate::new(37.0 + n as f64 * 0.001, 127.0),
        UNIX_EPOCH + Duration::from_secs(1_700_000_000 + n),
    )
}

pub fn fresh_reading(lat: f64, lon: f64) -> Reading {
    Reading::new(Coordinate::new(lat, lon), SystemTime::now())
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Give in-flight tasks a chance to run before asserting something did not happen.
pub async fn quiesce() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
