//! Domain Entities - Core location objects
//!
//! These entities represent what the positioning backend produces and what
//! the service hands to its subscriber. They have no external dependencies.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// A point on the Earth's surface in degrees.
///
/// No invariant is enforced on construction; out-of-range or NaN values are
/// carried as-is and propagate through distance math.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and inside their degree ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Parse a `lat,lon` pair such as `"65.970738,-18.532690"`.
    pub fn parse(s: &str) -> Option<Self> {
        let (lat, lon) = s.split_once(',')?;
        let latitude = lat.trim().parse().ok()?;
        let longitude = lon.trim().parse().ok()?;
        Some(Self::new(latitude, longitude))
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// A single observation from the positioning backend.
///
/// Readings are immutable once built; the service caches a copy of the most
/// recent one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    coordinate: Coordinate,
    captured_at: SystemTime,
}

impl Reading {
    pub fn new(coordinate: Coordinate, captured_at: SystemTime) -> Self {
        Self {
            coordinate,
            captured_at,
        }
    }

    /// A reading captured right now.
    pub fn now(coordinate: Coordinate) -> Self {
        Self::new(coordinate, SystemTime::now())
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }
}
