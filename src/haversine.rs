//! Haversine great-circle distance and an offline route estimator.
//!
//! The straight-line distance drives nearest-facility pre-filtering. The
//! [`HaversineRouter`] turns it into a travel estimate when OSRM is
//! unavailable; less accurate (ignores roads) but always available.

use crate::coordinate::Coordinate;
use crate::error::RoutingError;
use crate::traits::{RouteProvider, RouteSummary};

/// Mean Earth radius in kilometers (IUGG).
///
/// Distances in tests are reproducible only against this constant.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 60.0;

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    // Rounding can push `a` just past 1 for antipodal points.
    let a = ((delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Haversine-based route estimator.
///
/// Estimates travel time using straight-line distance and an assumed speed.
#[derive(Debug, Clone)]
pub struct HaversineRouter {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineRouter {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineRouter {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Convert distance in km to travel time in minutes.
    fn km_to_minutes(&self, km: f64) -> f64 {
        km / self.speed_kmh * 60.0
    }
}

impl RouteProvider for HaversineRouter {
    fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, RoutingError> {
        origin.validate()?;
        destination.validate()?;

        let distance_km = haversine_km(origin, destination);
        Ok(RouteSummary {
            distance_km,
            duration_min: self.km_to_minutes(distance_km),
        })
    }
}
