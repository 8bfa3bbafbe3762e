use crate::application::DEFAULT_RESOLUTION_KEY;
use crate::domain::entities::Coordinate;
use crate::domain::value_objects::{LocationRequest, Priority};
use serde::Deserialize;
use std::time::Duration;

/// Default simulated starting point (Seoul City Hall).
const DEFAULT_SIM_ORIGIN: (f64, f64) = (37.5665, 126.9780);

/// Process configuration for the `geofix` binary, read from the environment.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub debug: bool,
    pub mode: String,

    // Location request
    pub priority: String,
    pub interval_ms: u64,
    pub fastest_interval_ms: u64,

    // Resolution flag persistence
    pub state_db_path: Option<String>,
    pub resolution_key: String,
    pub resolution_retries: u32,

    pub fallback_coordinate: Option<Coordinate>,

    // Simulated backend
    pub sim_origin: Coordinate,
    pub sim_scenario: String,
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            mode: "track".to_string(),
            priority: "balanced".to_string(),
            interval_ms: 5000,
            fastest_interval_ms: 1000,
            state_db_path: None,
            resolution_key: DEFAULT_RESOLUTION_KEY.to_string(),
            resolution_retries: 1,
            fallback_coordinate: None,
            sim_origin: Coordinate::new(DEFAULT_SIM_ORIGIN.0, DEFAULT_SIM_ORIGIN.1),
            sim_scenario: "ok".to_string(),
            json_output: false,
        }
    }
}

impl Config {
    /// Whether the binary should request a single fix instead of tracking.
    pub fn one_shot(&self) -> bool {
        matches!(self.mode.to_lowercase().as_str(), "one-shot" | "oneshot" | "once")
    }

    /// Build and validate the library configuration for the service.
    pub fn service_config(&self) -> Result<ServiceConfig, ConfigError> {
        let request = LocationRequest {
            priority: Priority::from_str(&self.priority),
            interval: Duration::from_millis(self.interval_ms),
            fastest_interval: Duration::from_millis(self.fastest_interval_ms),
        };

        let mut config = ServiceConfig::new()
            .request(request)
            .resolution_key(self.resolution_key.clone())
            .resolution_retries(self.resolution_retries);
        if let Some(fallback) = self.fallback_coordinate {
            config = config.fallback_coordinate(fallback);
        }

        config.validate()?;
        Ok(config)
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}

/// Parse an optional `lat,lon` variable. Unset is fine; malformed or out of
/// range is an error.
fn coordinate_var(name: &str, raw: Option<String>) -> anyhow::Result<Option<Coordinate>> {
    match raw {
        Some(raw) => Coordinate::parse(&raw)
            .filter(Coordinate::is_valid)
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("{} must be `lat,lon`, got {:?}", name, raw)),
        None => Ok(None),
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    let debug = std::env::var("DEBUG").is_ok();

    let mode = std::env::var("GEOFIX_MODE").unwrap_or_else(|_| "track".to_string());

    let priority = std::env::var("GEOFIX_PRIORITY").unwrap_or_else(|_| "balanced".to_string());

    let interval_ms = std::env::var("GEOFIX_INTERVAL_MS")
        .unwrap_or_else(|_| "5000".to_string())
        .parse()
        .unwrap_or(5000);

    let fastest_interval_ms = std::env::var("GEOFIX_FASTEST_INTERVAL_MS")
        .unwrap_or_else(|_| "1000".to_string())
        .parse()
        .unwrap_or(1000);

    let state_db_path = std::env::var("GEOFIX_STATE_DB_PATH").ok();

    let resolution_key = std::env::var("GEOFIX_RESOLUTION_KEY")
        .unwrap_or_else(|_| DEFAULT_RESOLUTION_KEY.to_string());

    let resolution_retries = std::env::var("GEOFIX_RESOLUTION_RETRIES")
        .unwrap_or_else(|_| "1".to_string())
        .parse()
        .unwrap_or(1);

    let fallback_coordinate = coordinate_var(
        "GEOFIX_FALLBACK_COORDINATE",
        std::env::var("GEOFIX_FALLBACK_COORDINATE").ok(),
    )?;

    let sim_origin = coordinate_var("GEOFIX_SIM_ORIGIN", std::env::var("GEOFIX_SIM_ORIGIN").ok())?
        .unwrap_or_else(|| Coordinate::new(DEFAULT_SIM_ORIGIN.0, DEFAULT_SIM_ORIGIN.1));

    let sim_scenario = std::env::var("GEOFIX_SIM_SCENARIO").unwrap_or_else(|_| "ok".to_string());

    let json_output = env_flag("GEOFIX_JSON");

    Ok(Config {
        debug,
        mode,
        priority,
        interval_ms,
        fastest_interval_ms,
        state_db_path,
        resolution_key,
        resolution_retries,
        fallback_coordinate,
        sim_origin,
        sim_scenario,
        json_output,
    })
}

/// Library configuration for a [`LocationService`](crate::LocationService).
///
/// The fallback coordinate is an explicit opt-in: when set,
/// `current_coordinate()` returns it instead of failing before the first
/// reading arrives. Leave it unset in production.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub request: LocationRequest,
    pub resolution_key: String,
    /// Reconnect attempts when a resolution host fails to start its flow
    pub resolution_retries: u32,
    pub fallback_coordinate: Option<Coordinate>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            request: LocationRequest::default(),
            resolution_key: DEFAULT_RESOLUTION_KEY.to_string(),
            resolution_retries: 1,
            fallback_coordinate: None,
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(mut self, request: LocationRequest) -> Self {
        self.request = request;
        self
    }

    pub fn resolution_key(mut self, key: impl Into<String>) -> Self {
        self.resolution_key = key.into();
        self
    }

    pub fn resolution_retries(mut self, retries: u32) -> Self {
        self.resolution_retries = retries;
        self
    }

    pub fn fallback_coordinate(mut self, coordinate: Coordinate) -> Self {
        self.fallback_coordinate = Some(coordinate);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution_key.is_empty() {
            return Err(ConfigError::MissingResolutionKey);
        }
        if self.request.interval.is_zero() || self.request.fastest_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.request.fastest_interval > self.request.interval {
            return Err(ConfigError::FastestIntervalTooLong {
                fastest: self.request.fastest_interval,
                interval: self.request.interval,
            });
        }
        if let Some(fallback) = self.fallback_coordinate {
            if !fallback.is_valid() {
                return Err(ConfigError::InvalidFallback(fallback));
            }
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("resolution_key is required")]
    MissingResolutionKey,
    #[error("update intervals must be non-zero")]
    ZeroInterval,
    #[error("fastest interval {fastest:?} exceeds update interval {interval:?}")]
    FastestIntervalTooLong {
        fastest: Duration,
        interval: Duration,
    },
    #[error("fallback coordinate {0} is out of range")]
    InvalidFallback(Coordinate),
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    // ===== Config Tests =====

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.mode, "track");
        assert_eq!(cfg.priority, "balanced");
        assert_eq!(cfg.interval_ms, 5000);
        assert_eq!(cfg.fastest_interval_ms, 1000);
        assert_eq!(cfg.resolution_key, "location.resolving_error");
        assert!(cfg.state_db_path.is_none());
        assert!(cfg.fallback_coordinate.is_none());
        assert!(!cfg.one_shot());
    }

    #[test]
    fn test_one_shot_mode_names() {
        for mode in ["one-shot", "ONESHOT", "once"] {
            let cfg = Config {
                mode: mode.to_string(),
                ..Config::default()
            };
            assert!(cfg.one_shot(), "mode: {}", mode);
        }
    }

    #[test]
    fn test_service_config_from_config() {
        let cfg = Config {
            priority: "high".to_string(),
            interval_ms: 2000,
            fastest_interval_ms: 500,
            fallback_coordinate: Some(Coordinate::new(65.970738, -18.532690)),
            ..Config::default()
        };

        let service = cfg.service_config().unwrap();
        assert_eq!(service.request.priority, Priority::HighAccuracy);
        assert_eq!(service.request.interval, Duration::from_secs(2));
        assert_eq!(service.request.fastest_interval, Duration::from_millis(500));
        assert_eq!(
            service.fallback_coordinate,
            Some(Coordinate::new(65.970738, -18.532690))
        );
    }

    #[test]
    fn test_service_config_from_config_rejects_bad_intervals() {
        let cfg = Config {
            interval_ms: 1000,
            fastest_interval_ms: 2000,
            ..Config::default()
        };

        assert!(matches!(
            cfg.service_config(),
            Err(ConfigError::FastestIntervalTooLong { .. })
        ));
    }

    #[test]
    fn test_coordinate_var_unset() {
        assert_eq!(coordinate_var("GEOFIX_SIM_ORIGIN", None).unwrap(), None);
    }

    #[test]
    fn test_coordinate_var_parses() {
        let parsed = coordinate_var("GEOFIX_SIM_ORIGIN", Some("1.5,-2.25".to_string())).unwrap();
        assert_eq!(parsed, Some(Coordinate::new(1.5, -2.25)));
    }

    #[test]
    fn test_coordinate_var_rejects_malformed() {
        for raw in ["north", "91,0", "1.0"] {
            let err = coordinate_var("GEOFIX_SIM_ORIGIN", Some(raw.to_string())).unwrap_err();
            assert!(err.to_string().contains("GEOFIX_SIM_ORIGIN"), "raw: {}", raw);
        }
    }

    // ===== ServiceConfig Tests =====

    #[test]
    fn test_service_config_default() {
        let config = ServiceConfig::default();
        assert_eq!(config.request, LocationRequest::default());
        assert_eq!(config.resolution_key, DEFAULT_RESOLUTION_KEY);
        assert_eq!(config.resolution_retries, 1);
        assert!(config.fallback_coordinate.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ServiceConfig::new()
            .resolution_key("host-a")
            .resolution_retries(3)
            .fallback_coordinate(Coordinate::new(1.0, 2.0));

        assert_eq!(config.resolution_key, "host-a");
        assert_eq!(config.resolution_retries, 3);
        assert_eq!(config.fallback_coordinate, Some(Coordinate::new(1.0, 2.0)));
    }

    #[test]
    fn test_validate_missing_key() {
        let config = ServiceConfig::new().resolution_key("");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingResolutionKey)
        ));
    }

    #[test]
    fn test_validate_zero_interval() {
        let config = ServiceConfig::new().request(LocationRequest {
            interval: Duration::ZERO,
            ..LocationRequest::default()
        });
        assert!(matches!(config.validate(), Err(ConfigError::ZeroInterval)));
    }

    #[test]
    fn test_validate_invalid_fallback() {
        let config = ServiceConfig::new().fallback_coordinate(Coordinate::new(120.0, 0.0));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFallback(_))
        ));
    }
}
