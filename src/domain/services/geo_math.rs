//! Geo Math Service
//!
//! Great-circle distance between coordinates and unit conversions.
//! Pure functions with no state.

use crate::domain::entities::Coordinate;

/// Earth's mean radius in meters (IUGG).
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

const METERS_PER_KILOMETER: f64 = 1000.0;
const MILES_PER_METER: f64 = 0.000621371;

/// Distance calculations on a spherical Earth.
///
/// Invalid input is not rejected: a NaN component yields a NaN distance.
pub struct GeoMath;

impl GeoMath {
    /// Great-circle distance in meters between two coordinates (haversine).
    pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
        let lat1 = a.latitude.to_radians();
        let lat2 = b.latitude.to_radians();
        let delta_lat = (b.latitude - a.latitude).to_radians();
        let delta_lon = (b.longitude - a.longitude).to_radians();

        let sin_dlat = (delta_lat / 2.0).sin();
        let sin_dlon = (delta_lon / 2.0).sin();
        let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;

        // Rounding can push near-antipodal points just past 1.0. The comparison
        // is false for NaN, so NaN still flows through.
        let h = if h > 1.0 { 1.0 } else { h };

        let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
        EARTH_MEAN_RADIUS_M * c
    }

    pub fn to_kilometers(meters: f64) -> f64 {
        meters / METERS_PER_KILOMETER
    }

    pub fn to_miles(meters: f64) -> f64 {
        meters * MILES_PER_METER
    }

    /// Distance in kilometers between two coordinates.
    pub fn distance_km(a: &Coordinate, b: &Coordinate) -> f64 {
        Self::to_kilometers(Self::distance_meters(a, b))
    }

    /// Distance in statute miles between two coordinates.
    pub fn distance_miles(a: &Coordinate, b: &Coordinate) -> f64 {
        Self::to_miles(Self::distance_meters(a, b))
    }
}
