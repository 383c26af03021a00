//! OSRM HTTP adapter for point-to-point routes.

use serde::Deserialize;
use tracing::debug;

use crate::coordinate::Coordinate;
use crate::error::RoutingError;
use crate::traits::{RouteProvider, RouteSummary};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.project-osrm.org".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn route_url(&self, origin: Coordinate, destination: Coordinate) -> String {
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=false",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            origin.lon,
            origin.lat,
            destination.lon,
            destination.lat
        )
    }
}

impl RouteProvider for OsrmClient {
    fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, RoutingError> {
        origin.validate()?;
        destination.validate()?;

        let url = self.route_url(origin, destination);
        debug!(%url, "requesting OSRM route");

        let response = self.client.get(url).send()?;
        let status = response.status();
        let body = response.text()?;

        parse_route_response(status.as_u16(), &body)
    }
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    /// Meters.
    distance: f64,
    /// Seconds.
    duration: f64,
}

/// Interprets an OSRM `/route` reply.
///
/// OSRM reports failures such as `NoRoute` as a JSON body on a 4xx status, so
/// the body is inspected before the status.
pub fn parse_route_response(status: u16, body: &str) -> Result<RouteSummary, RoutingError> {
    let parsed = serde_json::from_str::<OsrmRouteResponse>(body);

    let response = match parsed {
        Ok(response) => response,
        Err(_) if !(200..300).contains(&status) => return Err(RoutingError::Status(status)),
        Err(err) => return Err(RoutingError::Parse(err)),
    };

    if response.code != "Ok" {
        return Err(RoutingError::Service {
            code: response.code,
            message: response.message.unwrap_or_default(),
        });
    }
    if !(200..300).contains(&status) {
        return Err(RoutingError::Status(status));
    }

    let route = response.routes.first().ok_or(RoutingError::NoRoute)?;
    Ok(RouteSummary {
        distance_km: route.distance / 1000.0,
        duration_min: route.duration / 60.0,
    })
}
