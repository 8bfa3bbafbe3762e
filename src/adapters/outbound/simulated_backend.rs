//! Simulated Positioning Backend
//!
//! Implements PositioningBackend in memory. Outcomes are scripted, readings
//! are pushed by hand or by a drift task wandering around an origin. Used by
//! the demo binary and the tests.

use crate::domain::entities::{Coordinate, Reading};
use crate::domain::ports::{PositioningBackend, ReadingStream};
use crate::domain::value_objects::{
    ConfigurationStatus, ConnectOutcome, LocationRequest, ResolutionProblem,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const STREAM_CAPACITY: usize = 64;

/// Largest step of the drift task, in degrees (~50 m).
const DRIFT_STEP_DEG: f64 = 0.0005;

/// Canned behaviours for the demo binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Connects and settings are sufficient
    Ok,
    /// First connect needs a resolution flow, the retry succeeds
    NeedsResolution,
    /// Connects, but the configuration check asks for a resolution
    SettingsResolution,
    /// Connects, but settings can never satisfy the request
    SettingsFatal,
    /// Every connect fails
    Fatal,
}

impl Scenario {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ok" => Some(Self::Ok),
            "needs-resolution" => Some(Self::NeedsResolution),
            "settings-resolution" => Some(Self::SettingsResolution),
            "settings-fatal" => Some(Self::SettingsFatal),
            "fatal" => Some(Self::Fatal),
            _ => None,
        }
    }
}

/// In-memory positioning backend.
pub struct SimulatedBackend {
    origin: Coordinate,
    position: Mutex<Coordinate>,
    connects: Mutex<VecDeque<ConnectOutcome>>,
    fallback_connect: Mutex<ConnectOutcome>,
    configuration: Mutex<ConfigurationStatus>,
    last_known: Mutex<Option<Reading>>,
    stream: Mutex<Option<mpsc::Sender<Reading>>>,
    /// Connect attempts wait here while the gate is closed
    gate: watch::Sender<bool>,
    connected: AtomicBool,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
}

impl SimulatedBackend {
    pub fn new(origin: Coordinate) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            origin,
            position: Mutex::new(origin),
            connects: Mutex::new(VecDeque::new()),
            fallback_connect: Mutex::new(ConnectOutcome::Connected),
            configuration: Mutex::new(ConfigurationStatus::Sufficient),
            last_known: Mutex::new(None),
            stream: Mutex::new(None),
            gate,
            connected: AtomicBool::new(false),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            subscribe_calls: AtomicUsize::new(0),
            unsubscribe_calls: AtomicUsize::new(0),
        }
    }

    /// Configure the backend for one of the canned scenarios.
    pub fn apply_scenario(&self, scenario: Scenario) {
        match scenario {
            Scenario::Ok => {}
            Scenario::NeedsResolution => {
                self.script_connects(vec![ConnectOutcome::Recoverable(ResolutionProblem::new(
                    4,
                    "positioning service requires sign-in",
                ))]);
            }
            Scenario::SettingsResolution => {
                self.set_configuration_status(ConfigurationStatus::InsufficientResolvable(
                    ResolutionProblem::new(6, "high accuracy mode is disabled"),
                ));
            }
            Scenario::SettingsFatal => {
                self.set_configuration_status(ConfigurationStatus::InsufficientFatal(
                    "no positioning sources available".to_string(),
                ));
            }
            Scenario::Fatal => {
                *self.fallback_connect.lock() =
                    ConnectOutcome::Fatal("positioning service not installed".to_string());
            }
        }
    }

    /// Queue outcomes for the next connect attempts. Once drained, connects
    /// succeed (or follow the `Fatal` scenario).
    pub fn script_connects(&self, outcomes: Vec<ConnectOutcome>) {
        self.connects.lock().extend(outcomes);
    }

    pub fn set_configuration_status(&self, status: ConfigurationStatus) {
        *self.configuration.lock() = status;
    }

    pub fn set_last_known(&self, reading: Option<Reading>) {
        *self.last_known.lock() = reading;
    }

    /// Make connect attempts wait until [`release_connects`](Self::release_connects).
    pub fn hold_connects(&self) {
        self.gate.send_replace(false);
    }

    pub fn release_connects(&self) {
        self.gate.send_replace(true);
    }

    /// Push a reading to the current subscriber.
    ///
    /// Returns false when nobody is subscribed.
    pub async fn push_reading(&self, reading: Reading) -> bool {
        let sender = self.stream.lock().clone();
        let Some(sender) = sender else {
            return false;
        };
        *self.last_known.lock() = Some(reading);
        sender.send(reading).await.is_ok()
    }

    /// Spawn a task that pushes a reading every `interval`, wandering around
    /// the origin. Readings are only produced while someone is subscribed.
    pub fn start_drift(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let backend = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if !backend.is_subscribed() {
                    continue;
                }
                let reading = Reading::now(backend.step());
                if !backend.push_reading(reading).await {
                    tracing::trace!("drift reading dropped, no subscriber");
                }
            }
        })
    }

    fn step(&self) -> Coordinate {
        let mut position = self.position.lock();
        let dlat = (rand::random::<f64>() - 0.5) * 2.0 * DRIFT_STEP_DEG;
        let dlon = (rand::random::<f64>() - 0.5) * 2.0 * DRIFT_STEP_DEG;
        *position = Coordinate::new(
            (position.latitude + dlat).clamp(-90.0, 90.0),
            position.longitude + dlon,
        );
        *position
    }

    pub fn origin(&self) -> Coordinate {
        self.origin
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn is_subscribed(&self) -> bool {
        self.stream.lock().is_some()
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PositioningBackend for SimulatedBackend {
    async fn connect(&self) -> ConnectOutcome {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);

        let mut gate = self.gate.subscribe();
        // The sender lives in self, so the gate cannot close under us.
        let _ = gate.wait_for(|open| *open).await;

        let outcome = self
            .connects
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback_connect.lock().clone());
        if outcome == ConnectOutcome::Connected {
            self.connected.store(true, Ordering::SeqCst);
        }
        outcome
    }

    async fn disconnect(&self) {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        *self.stream.lock() = None;
    }

    async fn check_configuration(&self, _request: &LocationRequest) -> ConfigurationStatus {
        self.configuration.lock().clone()
    }

    async fn subscribe_readings(&self, request: &LocationRequest) -> ReadingStream {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            "simulated backend streaming priority={} interval={:?}",
            request.priority,
            request.interval
        );

        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        *self.stream.lock() = Some(tx);
        rx
    }

    async fn unsubscribe_readings(&self) {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        *self.stream.lock() = None;
    }

    async fn last_known_reading(&self) -> Option<Reading> {
        *self.last_known.lock()
    }
}
