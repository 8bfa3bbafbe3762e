//! Location Acquisition Service - Main application use case
//!
//! Public façade over the connection state machine. Owns the delivery policy,
//! the last-reading cache and the subscriber, and serializes every façade
//! call and backend result onto a single event loop.

use crate::application::connection_machine::{BackendEvent, ConnectionMachine};
use crate::application::resolution_state::ResolutionState;
use crate::config::ServiceConfig;
use crate::domain::entities::{Coordinate, Reading};
use crate::domain::ports::{LocationSubscriber, PositioningBackend, ResolutionFlagStore};
use crate::domain::value_objects::{ConnectionState, DeliveryPolicy};
use crate::error::LocationError;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Façade calls, applied by the event loop in order of arrival.
enum Command {
    Start {
        policy: DeliveryPolicy,
        subscriber: Arc<dyn LocationSubscriber>,
    },
    Stop,
    ResolutionOutcome {
        succeeded: bool,
    },
    /// Barrier: answered once every earlier command has been applied
    Settle(oneshot::Sender<()>),
}

/// Handle to a running location service.
///
/// Build one at the composition root and clone the handle into consumers.
/// Every clone drives the same event loop; the loop releases the backend
/// and exits once the last handle is dropped.
///
/// At most one service may be active per resolution flag key.
#[derive(Clone)]
pub struct LocationService {
    commands: mpsc::UnboundedSender<Command>,
    cache: Arc<RwLock<Option<Reading>>>,
    state: watch::Receiver<ConnectionState>,
    degraded: Arc<AtomicBool>,
    fallback: Option<Coordinate>,
}

impl LocationService {
    /// Create the service and spawn its event loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        backend: Arc<dyn PositioningBackend>,
        store: Arc<dyn ResolutionFlagStore>,
        config: ServiceConfig,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let machine =
            ConnectionMachine::new(backend, ResolutionState::new(store), &config, events_tx);
        let state = machine.watch_state();
        let degraded = machine.degraded_flag();
        let cache = Arc::new(RwLock::new(None));

        let event_loop = EventLoop {
            machine,
            policy: DeliveryPolicy::Track,
            subscriber: None,
            cache: cache.clone(),
            commands: commands_rx,
            events: events_rx,
        };
        tokio::spawn(event_loop.run());

        Self {
            commands: commands_tx,
            cache,
            state,
            degraded,
            fallback: config.fallback_coordinate,
        }
    }

    /// Forward every reading to `subscriber` until stopped.
    ///
    /// While already connecting or connected this only replaces the
    /// subscriber and resets the policy.
    pub fn start_tracking(
        &self,
        subscriber: Arc<dyn LocationSubscriber>,
    ) -> Result<(), LocationError> {
        self.send(Command::Start {
            policy: DeliveryPolicy::Track,
            subscriber,
        })
    }

    /// Forward exactly one reading to `subscriber`; later readings are only cached.
    pub fn request_one_shot(
        &self,
        subscriber: Arc<dyn LocationSubscriber>,
    ) -> Result<(), LocationError> {
        self.send(Command::Start {
            policy: DeliveryPolicy::OneShot,
            subscriber,
        })
    }

    /// Drop the subscriber and disconnect. Safe from any state.
    pub fn stop(&self) -> Result<(), LocationError> {
        self.send(Command::Stop)
    }

    /// Cancel a pending one-shot request.
    pub fn cancel_one_shot(&self) -> Result<(), LocationError> {
        self.stop()
    }

    /// Report how a resolution flow ended.
    ///
    /// Call once for every `on_resolution_required` that returned a host
    /// whose flow started or resumed.
    pub fn handle_resolution_outcome(&self, succeeded: bool) -> Result<(), LocationError> {
        self.send(Command::ResolutionOutcome { succeeded })
    }

    /// The most recent reading.
    pub fn current_reading(&self) -> Result<Reading, LocationError> {
        (*self.cache.read()).ok_or(LocationError::NoLocationAvailable)
    }

    /// Coordinate of the most recent reading, or the configured fallback.
    pub fn current_coordinate(&self) -> Result<Coordinate, LocationError> {
        match self.current_reading() {
            Ok(reading) => Ok(reading.coordinate()),
            Err(e) => match self.fallback {
                Some(fallback) => {
                    tracing::debug!("no reading yet, using fallback coordinate {}", fallback);
                    Ok(fallback)
                }
                None => Err(e),
            },
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver observing every connection state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Wait until the connection reaches `target`.
    pub async fn wait_for_state(&self, target: ConnectionState) -> Result<(), LocationError> {
        let mut state = self.state.clone();
        state
            .wait_for(|s| *s == target)
            .await
            .map(|_| ())
            .map_err(|_| LocationError::ServiceClosed)
    }

    /// Connected, but the configuration check reported a problem that no
    /// reading or resolution has cleared yet.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// Resolve once every façade call issued before this one has been applied.
    pub async fn settle(&self) -> Result<(), LocationError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Settle(tx))?;
        rx.await.map_err(|_| LocationError::ServiceClosed)
    }

    /// Handle that can report resolution outcomes without keeping the
    /// event loop alive. Give this to resolution hosts owned by a subscriber.
    pub fn downgrade(&self) -> WeakLocationService {
        WeakLocationService {
            commands: self.commands.downgrade(),
        }
    }

    fn send(&self, command: Command) -> Result<(), LocationError> {
        self.commands
            .send(command)
            .map_err(|_| LocationError::ServiceClosed)
    }
}

/// Non-owning handle to a [`LocationService`].
#[derive(Clone)]
pub struct WeakLocationService {
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl WeakLocationService {
    /// Same as [`LocationService::handle_resolution_outcome`]. Fails with
    /// `ServiceClosed` once every strong handle is gone.
    pub fn handle_resolution_outcome(&self, succeeded: bool) -> Result<(), LocationError> {
        let commands = self.commands.upgrade().ok_or(LocationError::ServiceClosed)?;
        commands
            .send(Command::ResolutionOutcome { succeeded })
            .map_err(|_| LocationError::ServiceClosed)
    }
}

/// Single owner of the machine, policy, subscriber and cache writes.
struct EventLoop {
    machine: ConnectionMachine,
    policy: DeliveryPolicy,
    subscriber: Option<Arc<dyn LocationSubscriber>>,
    cache: Arc<RwLock<Option<Reading>>>,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedReceiver<BackendEvent>,
}

impl EventLoop {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command).await,
                    None => break,
                },
                Some(event) = self.events.recv() => {
                    let subscriber = self.subscriber.clone();
                    if let Some(reading) = self.machine.handle(event, subscriber.as_deref()).await {
                        self.deliver(reading);
                    }
                }
                reading = self.machine.next_reading() => {
                    if let Some(reading) = self.machine.accept_reading(reading) {
                        self.deliver(reading);
                    }
                }
            }
        }

        self.subscriber = None;
        self.machine.disconnect().await;
        tracing::debug!("location service event loop stopped");
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Start { policy, subscriber } => {
                tracing::debug!("acquisition requested policy={}", policy);
                self.machine.connect(Some(subscriber.as_ref()));
                self.subscriber = Some(subscriber);
                self.policy = policy;
            }
            Command::Stop => {
                self.subscriber = None;
                self.policy = DeliveryPolicy::Track;
                self.machine.disconnect().await;
            }
            Command::ResolutionOutcome { succeeded } => {
                self.machine.on_resolution_outcome(succeeded);
            }
            Command::Settle(done) => {
                let _ = done.send(());
            }
        }
    }

    /// Cache the reading, then forward it if the policy allows.
    fn deliver(&mut self, reading: Reading) {
        *self.cache.write() = Some(reading);

        if !self.policy.forwards() {
            tracing::trace!("cached reading without forwarding");
            return;
        }

        if let Some(subscriber) = &self.subscriber {
            subscriber.on_reading(&reading);
            self.policy = self.policy.after_delivery();
        }
    }
}
