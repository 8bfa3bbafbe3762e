//! Connection State Machine
//!
//! Owns the backend connection handle and drives it through the transition
//! table in [`ConnectionState::next`]: connecting, configuration checks and
//! the resolution flow for recoverable errors.
//!
//! Every method runs on the service event loop. Slow backend calls (connect,
//! configuration check) are spawned and report back as [`BackendEvent`]s
//! tagged with the connection generation, so results that outlive a
//! disconnect are recognised as stale and dropped.

use crate::application::resolution_state::ResolutionState;
use crate::config::ServiceConfig;
use crate::domain::entities::Reading;
use crate::domain::ports::{LocationSubscriber, PositioningBackend, ReadingStream};
use crate::domain::value_objects::{
    ConfigurationStatus, ConnectOutcome, ConnectionState, LocationRequest, ResolutionProblem,
    Trigger,
};
use crate::error::AcquisitionFailure;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Results of spawned backend calls, delivered onto the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    ConnectFinished {
        generation: u64,
        outcome: ConnectOutcome,
    },
    ConfigurationChecked {
        generation: u64,
        status: ConfigurationStatus,
    },
}

/// State machine for the single backend connection of a service.
pub struct ConnectionMachine {
    backend: Arc<dyn PositioningBackend>,
    resolution: ResolutionState,
    resolution_key: String,
    request: LocationRequest,
    resolution_retries: u32,
    retries_left: u32,
    /// Bumped on every entry into `Disconnected`
    generation: u64,
    state: watch::Sender<ConnectionState>,
    /// Connected, but the configuration check reported a problem
    degraded: Arc<AtomicBool>,
    /// A resolution flow was started from the configuration check
    settings_resolution_pending: bool,
    readings: Option<ReadingStream>,
    events: mpsc::UnboundedSender<BackendEvent>,
}

impl ConnectionMachine {
    pub fn new(
        backend: Arc<dyn PositioningBackend>,
        resolution: ResolutionState,
        config: &ServiceConfig,
        events: mpsc::UnboundedSender<BackendEvent>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            backend,
            resolution,
            resolution_key: config.resolution_key.clone(),
            request: config.request,
            resolution_retries: config.resolution_retries,
            retries_left: config.resolution_retries,
            generation: 0,
            state,
            degraded: Arc::new(AtomicBool::new(false)),
            settings_resolution_pending: false,
            readings: None,
            events,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Shared view of the degraded condition.
    pub fn degraded_flag(&self) -> Arc<AtomicBool> {
        self.degraded.clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start connecting. A no-op unless disconnected.
    ///
    /// When the durable flag says an earlier host left a resolution flow
    /// pending, the subscriber's host is asked to resume it. If it does, the
    /// flow is adopted instead of opening a new connection. Otherwise nobody
    /// can answer for it, so the flag is dropped and a normal connect follows.
    pub fn connect(&mut self, subscriber: Option<&dyn LocationSubscriber>) {
        if self.state() == ConnectionState::Disconnected
            && self.resolution.is_resolving(&self.resolution_key)
        {
            let resumed = subscriber
                .and_then(|s| s.on_resolution_required())
                .map(|host| host.resume_resolution());
            match resumed {
                Some(Ok(())) => {
                    tracing::info!("resuming resolution flow left pending by a previous host");
                    self.apply(Trigger::ResumeResolution);
                    return;
                }
                Some(Err(e)) => {
                    tracing::warn!("{}, dropping leftover resolution flag", e);
                    self.resolution.clear_resolving(&self.resolution_key);
                }
                None => {
                    tracing::warn!("no host to resume pending resolution, dropping leftover flag");
                    self.resolution.clear_resolving(&self.resolution_key);
                }
            }
        }

        if self.apply(Trigger::Connect) {
            self.retries_left = self.resolution_retries;
            self.spawn_connect();
        }
    }

    /// Tear down whatever the current state holds and return to `Disconnected`.
    ///
    /// The reading subscription is released before the state flips.
    pub async fn disconnect(&mut self) {
        match self.state() {
            ConnectionState::Connected => {
                self.release_readings().await;
                self.backend.disconnect().await;
                if self.settings_resolution_pending {
                    self.resolution.clear_resolving(&self.resolution_key);
                }
                tracing::info!("disconnected from positioning backend");
            }
            ConnectionState::Connecting => {
                self.backend.disconnect().await;
                tracing::info!("aborted pending backend connection");
            }
            ConnectionState::ResolvingError => {
                self.resolution.clear_resolving(&self.resolution_key);
                tracing::info!("abandoned resolution flow");
            }
            ConnectionState::Disconnected => {}
        }

        self.settings_resolution_pending = false;
        self.degraded.store(false, Ordering::SeqCst);
        self.apply(Trigger::Disconnect);
    }

    /// Apply the result of a spawned backend call.
    ///
    /// Returns a reading the owning service should deliver, if any.
    pub async fn handle(
        &mut self,
        event: BackendEvent,
        subscriber: Option<&dyn LocationSubscriber>,
    ) -> Option<Reading> {
        match event {
            BackendEvent::ConnectFinished {
                generation,
                outcome,
            } => self.on_connect_finished(generation, outcome, subscriber).await,
            BackendEvent::ConfigurationChecked { generation, status } => {
                self.on_configuration_checked(generation, status, subscriber);
                None
            }
        }
    }

    /// The UI host finished a resolution flow.
    pub fn on_resolution_outcome(&mut self, succeeded: bool) {
        match self.state() {
            ConnectionState::ResolvingError => {
                self.resolution.clear_resolving(&self.resolution_key);
                self.apply(Trigger::ResolutionOutcome { succeeded });
                if succeeded {
                    tracing::info!("resolution succeeded, reconnecting");
                    self.retries_left = self.resolution_retries;
                    self.spawn_connect();
                } else {
                    tracing::info!("resolution declined, staying disconnected");
                }
            }
            ConnectionState::Connected if self.settings_resolution_pending => {
                self.settings_resolution_pending = false;
                self.resolution.clear_resolving(&self.resolution_key);
                // The flow is over either way; only a new check could re-raise it.
                self.degraded.store(false, Ordering::SeqCst);
                tracing::info!("settings resolution finished succeeded={}", succeeded);
            }
            state => {
                if self.resolution.is_resolving(&self.resolution_key) {
                    tracing::debug!("clearing resolution flag left by a previous host");
                    self.resolution.clear_resolving(&self.resolution_key);
                } else {
                    tracing::debug!("ignoring resolution outcome in state {}", state);
                }
            }
        }
    }

    /// Filter a reading pushed by the backend stream.
    ///
    /// Readings only count while connected; anything else is a stale callback.
    pub fn accept_reading(&mut self, reading: Reading) -> Option<Reading> {
        if self.state() != ConnectionState::Connected {
            tracing::debug!("dropping reading received in state {}", self.state());
            return None;
        }
        self.degraded.store(false, Ordering::SeqCst);
        Some(reading)
    }

    /// Wait for the next reading from the backend stream.
    ///
    /// Pends forever while there is no subscription. Cancel-safe.
    pub async fn next_reading(&mut self) -> Reading {
        loop {
            match self.readings.as_mut() {
                Some(stream) => match stream.recv().await {
                    Some(reading) => return reading,
                    None => {
                        tracing::debug!("reading stream closed by backend");
                        self.readings = None;
                    }
                },
                None => std::future::pending::<()>().await,
            }
        }
    }

    async fn on_connect_finished(
        &mut self,
        generation: u64,
        outcome: ConnectOutcome,
        subscriber: Option<&dyn LocationSubscriber>,
    ) -> Option<Reading> {
        if generation != self.generation || self.state() != ConnectionState::Connecting {
            tracing::debug!(
                "dropping stale connect outcome generation={} current={} state={}",
                generation,
                self.generation,
                self.state()
            );
            if outcome == ConnectOutcome::Connected && self.state() == ConnectionState::Disconnected
            {
                // Nobody owns this connection any more.
                self.backend.disconnect().await;
            }
            return None;
        }

        match outcome {
            ConnectOutcome::Connected => {
                self.readings = Some(self.backend.subscribe_readings(&self.request).await);
                self.apply(Trigger::ConnectSucceeded);
                tracing::info!(
                    "connected to positioning backend priority={} interval={:?}",
                    self.request.priority,
                    self.request.interval
                );
                self.spawn_configuration_check();
                self.backend.last_known_reading().await
            }
            ConnectOutcome::Recoverable(problem) => {
                self.on_recoverable_failure(problem, subscriber);
                None
            }
            ConnectOutcome::Fatal(reason) => {
                tracing::error!("positioning backend connection failed: {}", reason);
                self.apply(Trigger::ConnectFailedFatal);
                report(subscriber, AcquisitionFailure::ConnectionFailed(reason));
                None
            }
        }
    }

    fn on_recoverable_failure(
        &mut self,
        problem: ResolutionProblem,
        subscriber: Option<&dyn LocationSubscriber>,
    ) {
        let Some(host) = subscriber.and_then(|s| s.on_resolution_required()) else {
            tracing::error!("no resolution host for {}, giving up", problem);
            self.apply(Trigger::ConnectFailedFatal);
            report(subscriber, AcquisitionFailure::ResolutionUnavailable(problem));
            return;
        };

        match host.start_resolution(&problem) {
            Ok(()) => {
                self.resolution.set_resolving(&self.resolution_key);
                self.apply(Trigger::ConnectFailedRecoverable);
                tracing::info!("waiting for resolution of {}", problem);
            }
            Err(e) if self.retries_left > 0 => {
                self.retries_left -= 1;
                tracing::warn!("{}, retrying connect ({} retries left)", e, self.retries_left);
                self.spawn_connect();
            }
            Err(e) => {
                tracing::error!("{}, giving up", e);
                self.apply(Trigger::ConnectFailedFatal);
                report(subscriber, AcquisitionFailure::ResolutionLaunchFailed(problem));
            }
        }
    }

    fn on_configuration_checked(
        &mut self,
        generation: u64,
        status: ConfigurationStatus,
        subscriber: Option<&dyn LocationSubscriber>,
    ) {
        if generation != self.generation || self.state() != ConnectionState::Connected {
            tracing::debug!("dropping stale configuration check generation={}", generation);
            return;
        }

        match status {
            ConfigurationStatus::Sufficient => {
                tracing::debug!("location settings sufficient");
            }
            ConfigurationStatus::InsufficientResolvable(problem) => {
                self.degraded.store(true, Ordering::SeqCst);
                match subscriber.and_then(|s| s.on_resolution_required()) {
                    Some(host) => {
                        self.resolution.set_resolving(&self.resolution_key);
                        match host.start_resolution(&problem) {
                            Ok(()) => {
                                self.settings_resolution_pending = true;
                                tracing::info!("waiting for settings resolution of {}", problem);
                            }
                            Err(e) => {
                                // Stay connected; a cached or later reading may still arrive.
                                tracing::warn!("{}", e);
                                self.resolution.clear_resolving(&self.resolution_key);
                            }
                        }
                    }
                    None => {
                        tracing::warn!("location settings insufficient: {}", problem);
                        report(subscriber, AcquisitionFailure::SettingsInsufficient(problem));
                    }
                }
            }
            ConfigurationStatus::InsufficientFatal(reason) => {
                self.degraded.store(true, Ordering::SeqCst);
                tracing::warn!("location settings unusable: {}", reason);
                report(subscriber, AcquisitionFailure::SettingsUnavailable(reason));
            }
        }
    }

    /// Move along the transition table. Returns false for a no-op.
    fn apply(&mut self, trigger: Trigger) -> bool {
        let current = self.state();
        match current.next(trigger) {
            Some(next) => {
                if next == ConnectionState::Disconnected {
                    self.generation += 1;
                }
                tracing::debug!("connection {} -> {} on {:?}", current, next, trigger);
                self.state.send_replace(next);
                true
            }
            None => {
                tracing::debug!("ignoring {:?} in state {}", trigger, current);
                false
            }
        }
    }

    async fn release_readings(&mut self) {
        self.readings = None;
        self.backend.unsubscribe_readings().await;
    }

    fn spawn_connect(&self) {
        let backend = self.backend.clone();
        let events = self.events.clone();
        let generation = self.generation;

        tracing::debug!("connecting to positioning backend generation={}", generation);
        tokio::spawn(async move {
            let outcome = backend.connect().await;
            let _ = events.send(BackendEvent::ConnectFinished {
                generation,
                outcome,
            });
        });
    }

    fn spawn_configuration_check(&self) {
        let backend = self.backend.clone();
        let events = self.events.clone();
        let generation = self.generation;
        let request = self.request;

        tokio::spawn(async move {
            let status = backend.check_configuration(&request).await;
            let _ = events.send(BackendEvent::ConfigurationChecked { generation, status });
        });
    }
}

fn report(subscriber: Option<&dyn LocationSubscriber>, failure: AcquisitionFailure) {
    if let Some(subscriber) = subscriber {
        subscriber.on_acquisition_failed(&failure);
    }
}
