//! Mock route providers and highway locators.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use site_enrich::coordinate::Coordinate;
use site_enrich::error::{HighwayError, RoutingError};
use site_enrich::haversine::haversine_km;
use site_enrich::highway::HighwayAccess;
use site_enrich::traits::{HighwayLocator, RouteProvider, RouteSummary};

/// Road distances are straight-line distances times this factor.
pub const DETOUR_FACTOR: f64 = 1.3;

/// Deterministic router that counts calls and fails for chosen destinations.
#[derive(Default)]
pub struct MockRouter {
    calls: AtomicUsize,
    requests: Mutex<Vec<(Coordinate, Coordinate)>>,
    failing_destinations: Vec<Coordinate>,
    failing_origins: Vec<Coordinate>,
}

impl MockRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_to(mut self, destination: Coordinate) -> Self {
        self.failing_destinations.push(destination);
        self
    }

    pub fn failing_from(mut self, origin: Coordinate) -> Self {
        self.failing_origins.push(origin);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(Coordinate, Coordinate)> {
        self.requests.lock().unwrap().clone()
    }
}

fn near(a: Coordinate, b: Coordinate) -> bool {
    (a.lat - b.lat).abs() < 1e-6 && (a.lon - b.lon).abs() < 1e-6
}

impl RouteProvider for MockRouter {
    fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((origin, destination));

        if self.failing_destinations.iter().any(|d| near(*d, destination))
            || self.failing_origins.iter().any(|o| near(*o, origin))
        {
            return Err(RoutingError::Service {
                code: "NoRoute".to_string(),
                message: "Impossible route between points".to_string(),
            });
        }

        let distance_km = haversine_km(origin, destination) * DETOUR_FACTOR;
        Ok(RouteSummary {
            distance_km,
            duration_min: distance_km / 70.0 * 60.0,
        })
    }
}

/// Highway locator backed by a fixed list of access nodes.
#[derive(Default)]
pub struct MockLocator {
    nodes: Vec<(Option<&'static str>, Option<&'static str>, Coordinate)>,
    unavailable: bool,
}

impl MockLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, name: Option<&'static str>, reference: Option<&'static str>, at: Coordinate) -> Self {
        self.nodes.push((name, reference, at));
        self
    }

    /// Every lookup fails as if the service returned HTTP 504.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

impl HighwayLocator for MockLocator {
    fn nearest_access(&self, origin: Coordinate, radius_km: f64) -> Result<Option<HighwayAccess>, HighwayError> {
        if self.unavailable {
            return Err(HighwayError::Status(504));
        }

        Ok(self
            .nodes
            .iter()
            .map(|(name, reference, at)| HighwayAccess {
                name: name.map(String::from),
                reference: reference.map(String::from),
                highway_type: "motorway_junction".to_string(),
                coordinate: *at,
                distance_km: haversine_km(origin, *at),
            })
            .filter(|access| access.distance_km <= radius_km)
            .min_by(|a, b| a.distance_km.total_cmp(&b.distance_km)))
    }
}
