//! Real Polish locations for realistic test fixtures.
//!
//! Coordinates sourced from OpenStreetMap. Sites are industrial parks and
//! logistics zones typical of site-selection inputs.

use site_enrich::catalog::{FacilityCatalog, FacilityRecord};
use site_enrich::coordinate::Coordinate;
use site_enrich::enrich::Site;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    pub fn site(&self) -> Site {
        Site::new(self.name, self.lat, self.lng)
    }
}

// ============================================================================
// Candidate sites
// ============================================================================

pub const SITES: &[Location] = &[
    Location::new("Warsaw Służewiec", 52.1810, 20.9990),
    Location::new("Stryków Logistics Park", 51.9040, 19.6010),
    Location::new("Gliwice Industrial Zone", 50.2980, 18.6720),
    Location::new("Gdańsk Port Logistics", 54.3840, 18.6820),
    Location::new("Poznań Komorniki", 52.3390, 16.8110),
];

/// Remote point in the Bieszczady mountains, far from any 100k+ city.
pub const BIESZCZADY: Location = Location::new("Wetlina", 49.1450, 22.4830);

// ============================================================================
// Hubs
// ============================================================================

pub const AIRPORTS: &[(&str, &str, f64, f64)] = &[
    ("Warsaw Chopin Airport", "WAW", 52.1657, 20.9671),
    ("Warsaw Modlin Airport", "WMI", 52.4511, 20.6518),
    ("Łódź Władysław Reymont Airport", "LCJ", 51.7219, 19.3981),
    ("Katowice Airport", "KTW", 50.4743, 19.0800),
    ("Gdańsk Lech Wałęsa Airport", "GDN", 54.3776, 18.4662),
    ("Poznań–Ławica Airport", "POZ", 52.4210, 16.8263),
];

pub const SEAPORTS: &[(&str, f64, f64)] = &[
    ("Port of Gdańsk", 54.3954, 18.6684),
    ("Port of Gdynia", 54.5335, 18.5470),
    ("Port of Szczecin", 53.4302, 14.5761),
];

pub fn airports() -> FacilityCatalog {
    FacilityCatalog::from_records(
        "airports",
        AIRPORTS.iter().map(|(name, code, lat, lon)| FacilityRecord {
            name: Some(name.to_string()),
            code: Some(code.to_string()),
            lat: Some(*lat),
            lon: Some(*lon),
            pop: None,
        }),
    )
    .expect("airport fixtures are valid")
}

pub fn seaports() -> FacilityCatalog {
    FacilityCatalog::from_records(
        "seaports",
        SEAPORTS.iter().map(|(name, lat, lon)| FacilityRecord {
            name: Some(name.to_string()),
            lat: Some(*lat),
            lon: Some(*lon),
            ..FacilityRecord::default()
        }),
    )
    .expect("seaport fixtures are valid")
}

/// A2/A1 interchange near Stryków.
pub const STRYKOW_JUNCTION: Location = Location::new("Stryków", 51.9105, 19.5950);

/// S8 junction on the southern edge of Warsaw.
pub const WARSAW_JUNCTION: Location = Location::new("Warszawa Opacz", 52.1780, 20.9430);

// ============================================================================
// Cities
// ============================================================================

pub const CITIES_JSON: &str = r#"{
    "version": "fixture",
    "regions": {
        "PL": [
            {"name": "Warsaw", "lat": 52.2319, "lon": 21.0067, "pop": 1793579},
            {"name": "Łódź", "lat": 51.7592, "lon": 19.4560, "pop": 664071},
            {"name": "Katowice", "lat": 50.2649, "lon": 19.0238, "pop": 285711},
            {"name": "Gliwice", "lat": 50.2945, "lon": 18.6714, "pop": 0},
            {"name": "Gdańsk", "lat": 54.3520, "lon": 18.6466, "pop": 470907},
            {"name": "Poznań", "lat": 52.4064, "lon": 16.9252, "pop": 532048},
            {"name": "Missing Longitude", "lat": 51.0}
        ]
    }
}"#;

pub fn cities() -> FacilityCatalog {
    FacilityCatalog::from_json_str(CITIES_JSON).expect("city fixtures are valid")
}
