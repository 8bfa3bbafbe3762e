mod geo_math;

pub use geo_math::{GeoMath, EARTH_MEAN_RADIUS_M};
