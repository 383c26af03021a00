//! Core seams of the enrichment pipeline.
//!
//! The routing backend is an opaque collaborator; anything that can answer
//! "how far by road from A to B" implements [`RouteProvider`]. Highway access
//! points come from a [`HighwayLocator`].

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::error::{HighwayError, RoutingError};
use crate::highway::HighwayAccess;

/// Routed travel between two points.
///
/// Distance and duration always travel together so a record can never carry
/// one without the other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_km: f64,
    pub duration_min: f64,
}

/// Provides road distance/time between two coordinates.
pub trait RouteProvider {
    fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, RoutingError>;
}

impl<T: RouteProvider + ?Sized> RouteProvider for &T {
    fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, RoutingError> {
        (**self).route(origin, destination)
    }
}

impl<T: RouteProvider + ?Sized> RouteProvider for Box<T> {
    fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, RoutingError> {
        (**self).route(origin, destination)
    }
}

/// Finds the closest point where a site can join the trunk road network.
pub trait HighwayLocator {
    /// `Ok(None)` when nothing lies within `radius_km`.
    fn nearest_access(&self, origin: Coordinate, radius_km: f64) -> Result<Option<HighwayAccess>, HighwayError>;
}
