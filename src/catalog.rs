//! Immutable in-memory facility catalog.
//!
//! Facilities are grouped by region code for loading and organization only;
//! lookups scan every facility regardless of region. Entries without usable
//! coordinates are dropped at load time and counted, never raised.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use crate::coordinate::Coordinate;
use crate::error::DataError;

/// Bundled definition of EU cities with population of at least 100k.
const EU_CITIES_JSON: &str = include_str!("../data/eu_cities.json");

/// A known point of interest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facility {
    pub name: String,
    /// Short identifier such as an IATA code, when the source has one.
    pub code: Option<String>,
    pub region: String,
    pub coordinate: Coordinate,
    /// Population or other non-negative weight; zero and absent are both allowed.
    pub population: Option<u64>,
}

/// One unvalidated entry as it appears in a definition file or table.
///
/// Numeric fields accept numbers or numeric strings; anything else reads as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacilityRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, alias = "latitude", deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, alias = "longitude", alias = "lng", deserialize_with = "lenient_f64")]
    pub lon: Option<f64>,
    #[serde(default, alias = "population", deserialize_with = "lenient_u64")]
    pub pop: Option<u64>,
}

impl FacilityRecord {
    fn into_facility(self, region: &str) -> Option<Facility> {
        let name = self.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())?;
        let coordinate = Coordinate::try_from_parts(self.lat, self.lon).ok()?;
        let code = self.code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());

        Some(Facility {
            name,
            code,
            region: region.to_string(),
            coordinate,
            population: self.pop,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDefinition {
    #[serde(default)]
    version: Option<String>,
    regions: BTreeMap<String, Vec<serde_json::Value>>,
}

/// Read-only collection of facilities grouped by region code.
///
/// Iteration order is regions sorted by code, then definition order within a
/// region. It never changes after load.
#[derive(Debug, Clone)]
pub struct FacilityCatalog {
    version: Option<String>,
    regions: BTreeMap<String, Vec<Facility>>,
    skipped: usize,
}

impl FacilityCatalog {
    /// Loads the bundled EU cities definition.
    pub fn load() -> Result<Self, DataError> {
        Self::from_json_str(EU_CITIES_JSON)
    }

    /// Loads a definition file of the form
    /// `{"version": "...", "regions": {"PL": [{"name", "lat", "lon", "pop"}]}}`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loading facility definition");
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> Result<Self, DataError> {
        let definition: CatalogDefinition = serde_json::from_str(data)?;

        let mut skipped = 0;
        let mut regions = BTreeMap::new();
        for (region, entries) in definition.regions {
            let region = region.trim().to_string();
            let mut facilities = Vec::with_capacity(entries.len());
            for entry in entries {
                let facility = serde_json::from_value::<FacilityRecord>(entry)
                    .ok()
                    .and_then(|record| record.into_facility(&region));
                match facility {
                    Some(facility) => facilities.push(facility),
                    None => skipped += 1,
                }
            }
            regions.insert(region, facilities);
        }

        Self::finish(definition.version, regions, skipped)
    }

    /// Builds a single-region catalog from already-parsed rows (e.g. an airport table).
    pub fn from_records(
        region: &str,
        records: impl IntoIterator<Item = FacilityRecord>,
    ) -> Result<Self, DataError> {
        let mut skipped = 0;
        let mut facilities = Vec::new();
        for record in records {
            match record.into_facility(region) {
                Some(facility) => facilities.push(facility),
                None => skipped += 1,
            }
        }

        let mut regions = BTreeMap::new();
        regions.insert(region.to_string(), facilities);
        Self::finish(None, regions, skipped)
    }

    fn finish(
        version: Option<String>,
        regions: BTreeMap<String, Vec<Facility>>,
        skipped: usize,
    ) -> Result<Self, DataError> {
        let catalog = Self {
            version,
            regions,
            skipped,
        };

        if catalog.is_empty() {
            return Err(DataError::Empty { skipped });
        }
        if skipped > 0 {
            warn!(skipped, "dropped facility entries without usable name or coordinates");
        }
        info!(
            facilities = catalog.len(),
            regions = catalog.regions.len(),
            version = catalog.version.as_deref().unwrap_or("unversioned"),
            "facility catalog loaded"
        );

        Ok(catalog)
    }

    /// Every valid facility, in stable catalog order.
    pub fn all(&self) -> impl Iterator<Item = &Facility> + '_ {
        self.regions.values().flatten()
    }

    /// Facilities of one region, in definition order.
    pub fn region(&self, code: &str) -> &[Facility] {
        self.regions.get(code).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn region_codes(&self) -> impl Iterator<Item = &str> + '_ {
        self.regions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.regions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries dropped at load.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        serde_json::Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }))
}
