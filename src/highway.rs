//! Nearest highway access via the Overpass API.
//!
//! Motorway junctions and motorway/trunk link roads are searched first; when
//! none lie within the radius, any primary or trunk road node is accepted.

use serde::Deserialize;
use tracing::debug;

use crate::coordinate::Coordinate;
use crate::error::HighwayError;
use crate::haversine::haversine_km;
use crate::traits::HighwayLocator;

/// Search radius around a site, in kilometers.
pub const DEFAULT_HIGHWAY_RADIUS_KM: f64 = 50.0;

/// A road network node near a site.
#[derive(Debug, Clone, PartialEq)]
pub struct HighwayAccess {
    pub name: Option<String>,
    /// Junction number (`ref` tag).
    pub reference: Option<String>,
    /// Value of the `highway` tag; `junction` when untagged.
    pub highway_type: String,
    pub coordinate: Coordinate,
    /// Straight-line distance from the site.
    pub distance_km: f64,
}

impl HighwayAccess {
    /// The node name, else its junction number, else its road type.
    pub fn label(&self) -> String {
        match (&self.name, &self.reference) {
            (Some(name), _) => name.clone(),
            (None, Some(reference)) => format!("Junction {reference}"),
            (None, None) => format!("Highway Access ({})", self.highway_type),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverpassConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            url: "https://overpass-api.de/api/interpreter".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverpassClient {
    config: OverpassConfig,
    client: reqwest::blocking::Client,
}

impl OverpassClient {
    pub fn new(config: OverpassConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("site-enrich/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { config, client })
    }

    fn query(&self, query: String) -> Result<Vec<OverpassElement>, HighwayError> {
        let response = self.client.post(&self.config.url).form(&[("data", query)]).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(HighwayError::Status(status.as_u16()));
        }
        let body = response.text()?;
        let parsed: OverpassResponse = serde_json::from_str(&body)?;
        Ok(parsed.elements)
    }
}

impl HighwayLocator for OverpassClient {
    fn nearest_access(&self, origin: Coordinate, radius_km: f64) -> Result<Option<HighwayAccess>, HighwayError> {
        origin.validate()?;

        let mut elements = self.query(junction_query(origin, radius_km))?;
        if elements.is_empty() {
            debug!(lat = origin.lat, lon = origin.lon, "no motorway access nearby; trying trunk roads");
            elements = self.query(trunk_road_query(origin, radius_km))?;
        }

        Ok(nearest_node(origin, elements))
    }
}

pub fn junction_query(origin: Coordinate, radius_km: f64) -> String {
    let around = around(origin, radius_km);
    format!(
        "[out:json][timeout:25];\
         (node[\"highway\"=\"motorway_junction\"]({around});\
         way[\"highway\"~\"motorway_link|trunk_link\"]({around});\
         node(w););\
         out body;>;out skel qt;"
    )
}

pub fn trunk_road_query(origin: Coordinate, radius_km: f64) -> String {
    let around = around(origin, radius_km);
    format!(
        "[out:json][timeout:25];\
         (way[\"highway\"~\"primary|trunk\"]({around});\
         node(w););\
         out body;>;out skel qt;"
    )
}

fn around(origin: Coordinate, radius_km: f64) -> String {
    format!("around:{:.0},{:.6},{:.6}", radius_km * 1000.0, origin.lat, origin.lon)
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    tags: OsmTags,
}

#[derive(Debug, Default, Deserialize)]
struct OsmTags {
    name: Option<String>,
    #[serde(rename = "ref")]
    reference: Option<String>,
    highway: Option<String>,
}

/// Picks the node closest to `origin` from an Overpass `elements` list.
/// Ways and nodes without coordinates are ignored.
fn nearest_node(origin: Coordinate, elements: Vec<OverpassElement>) -> Option<HighwayAccess> {
    let mut best: Option<HighwayAccess> = None;
    for element in elements {
        if element.kind != "node" {
            continue;
        }
        let (Some(lat), Some(lon)) = (element.lat, element.lon) else {
            continue;
        };
        let coordinate = Coordinate::new(lat, lon);
        if coordinate.validate().is_err() {
            continue;
        }

        let distance_km = haversine_km(origin, coordinate);
        if best.as_ref().is_some_and(|b| !(distance_km < b.distance_km)) {
            continue;
        }

        let tags = element.tags;
        best = Some(HighwayAccess {
            name: non_blank(tags.name),
            reference: non_blank(tags.reference),
            highway_type: non_blank(tags.highway).unwrap_or_else(|| "junction".to_string()),
            coordinate,
            distance_km,
        });
    }
    best
}

fn non_blank(tag: Option<String>) -> Option<String> {
    tag.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Nearest node in a raw Overpass JSON reply.
pub fn parse_nearest(origin: Coordinate, body: &str) -> Result<Option<HighwayAccess>, HighwayError> {
    let parsed: OverpassResponse = serde_json::from_str(body)?;
    Ok(nearest_node(origin, parsed.elements))
}
