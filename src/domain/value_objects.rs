//! Value Objects - Immutable domain primitives
//!
//! Policies, connection states and the typed outcomes the positioning backend
//! reports. Value objects are identified by their value and freely copied.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How readings reach the subscriber for the current acquisition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeliveryPolicy {
    /// Every reading is forwarded until the service is stopped.
    #[default]
    Track,
    /// The first reading is forwarded, then the policy becomes `Never`.
    OneShot,
    /// Readings are cached but never forwarded.
    Never,
}

impl DeliveryPolicy {
    /// Whether a reading arriving under this policy reaches the subscriber.
    pub fn forwards(&self) -> bool {
        !matches!(self, Self::Never)
    }

    /// Policy to apply once a reading has been forwarded.
    pub fn after_delivery(self) -> Self {
        match self {
            Self::OneShot => Self::Never,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::OneShot => "one-shot",
            Self::Never => "never",
        }
    }
}

impl std::fmt::Display for DeliveryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of the single backend connection owned by a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Initial state, and the state reached after an explicit stop
    #[default]
    Disconnected,
    /// A backend connection attempt is in flight
    Connecting,
    /// Connected and receiving readings
    Connected,
    /// Waiting for a UI host to report the outcome of a resolution flow
    ResolvingError,
}

/// Inputs that may move a [`ConnectionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Connect,
    Disconnect,
    ConnectSucceeded,
    ConnectFailedRecoverable,
    ConnectFailedFatal,
    ResolutionOutcome { succeeded: bool },
    /// A resolution started by an earlier host lifetime is still pending.
    ResumeResolution,
}

impl Trigger {
    /// Every trigger, for exhaustive checks over the transition table.
    pub const ALL: [Trigger; 8] = [
        Trigger::Connect,
        Trigger::Disconnect,
        Trigger::ConnectSucceeded,
        Trigger::ConnectFailedRecoverable,
        Trigger::ConnectFailedFatal,
        Trigger::ResolutionOutcome { succeeded: true },
        Trigger::ResolutionOutcome { succeeded: false },
        Trigger::ResumeResolution,
    ];
}

impl ConnectionState {
    pub const ALL: [ConnectionState; 4] = [
        ConnectionState::Disconnected,
        ConnectionState::Connecting,
        ConnectionState::Connected,
        ConnectionState::ResolvingError,
    ];

    /// Transition table.
    ///
    /// Returns the state reached when `trigger` is applied, or `None` when the
    /// combination is a no-op.
    pub fn next(self, trigger: Trigger) -> Option<ConnectionState> {
        use ConnectionState::*;

        match (self, trigger) {
            (Disconnected, Trigger::Connect) => Some(Connecting),
            (Disconnected, Trigger::ResumeResolution) => Some(ResolvingError),
            (Connecting, Trigger::ConnectSucceeded) => Some(Connected),
            (Connecting, Trigger::ConnectFailedRecoverable) => Some(ResolvingError),
            (Connecting, Trigger::ConnectFailedFatal) => Some(Disconnected),
            (Connecting, Trigger::Disconnect) => Some(Disconnected),
            (Connected, Trigger::Disconnect) => Some(Disconnected),
            (ResolvingError, Trigger::ResolutionOutcome { succeeded: true }) => Some(Connecting),
            (ResolvingError, Trigger::ResolutionOutcome { succeeded: false }) => {
                Some(Disconnected)
            }
            (ResolvingError, Trigger::Disconnect) => Some(Disconnected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::ResolvingError => "resolving-error",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requested accuracy, traded against power use by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    /// Most precise fix available (satellite positioning)
    HighAccuracy,
    /// Block-level accuracy (radio networks)
    #[default]
    BalancedPower,
    /// City-level accuracy
    LowPower,
    /// Only readings other consumers already requested
    Passive,
}

impl Priority {
    /// Parse a priority name, falling back to `BalancedPower`.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "high" => Self::HighAccuracy,
            "balanced" => Self::BalancedPower,
            "low" => Self::LowPower,
            "passive" => Self::Passive,
            _ => Self::BalancedPower,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighAccuracy => "high",
            Self::BalancedPower => "balanced",
            Self::LowPower => "low",
            Self::Passive => "passive",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the service asks of the backend: accuracy and update cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    pub priority: Priority,
    /// Desired interval between readings
    pub interval: Duration,
    /// Readings are never delivered faster than this
    pub fastest_interval: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            priority: Priority::BalancedPower,
            interval: Duration::from_secs(5),
            fastest_interval: Duration::from_secs(1),
        }
    }
}

/// A configuration problem a user can fix through a resolution flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionProblem {
    /// Backend-specific status code
    pub code: i32,
    pub message: String,
}

impl ResolutionProblem {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ResolutionProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Result of a backend connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    /// The user can fix this through a resolution flow
    Recoverable(ResolutionProblem),
    /// The backend cannot connect at all
    Fatal(String),
}

/// Result of the configuration check run right after connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationStatus {
    Sufficient,
    InsufficientResolvable(ResolutionProblem),
    InsufficientFatal(String),
}
