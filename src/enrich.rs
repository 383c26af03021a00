//! Per-site enrichment: nearest hubs, highway access, reference point, and
//! nearest large city.
//!
//! Every step is fail-soft. A failing step leaves its fields absent and adds a
//! [`Diagnostic`] to the site's record; it never aborts the site or the batch.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::RouteCache;
use crate::catalog::FacilityCatalog;
use crate::coordinate::Coordinate;
use crate::error::{InvalidInputError, RoutingError};
use crate::highway::DEFAULT_HIGHWAY_RADIUS_KM;
use crate::pacing::{Pacer, PacingPolicy};
use crate::resolver::NearestFacilityResolver;
use crate::traits::{HighwayLocator, RouteProvider, RouteSummary};

/// Search radius for the nearest city, in kilometers.
pub const DEFAULT_CITY_RADIUS_KM: f64 = 200.0;

/// Hubs routed per site after straight-line pre-filtering.
pub const DEFAULT_HUB_CANDIDATES: usize = 3;

/// A candidate site as read from the input table.
///
/// Coordinates are kept as the raw cell text so a bad value can be reported
/// verbatim instead of failing the whole table.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Site {
    #[serde(rename = "Project ID", default)]
    pub project_id: String,
    #[serde(rename = "Site ID", default)]
    pub site_id: String,
    #[serde(rename = "Site Name")]
    pub name: String,
    #[serde(rename = "Latitude", default)]
    pub latitude: Option<String>,
    #[serde(rename = "Longitude", default)]
    pub longitude: Option<String>,
}

impl Site {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude: Some(latitude.to_string()),
            longitude: Some(longitude.to_string()),
            ..Self::default()
        }
    }

    pub fn coordinate(&self) -> Result<Coordinate, InvalidInputError> {
        Coordinate::parse_parts(self.latitude.as_deref(), self.longitude.as_deref())
    }
}

fn parse_degrees(cell: Option<&str>) -> Option<f64> {
    cell.and_then(|c| c.trim().parse().ok())
}

/// A named fixed point every site is routed to.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePoint {
    pub name: String,
    pub coordinate: Coordinate,
}

/// Whether nearest-city enrichment runs, and against which catalog.
#[derive(Debug, Clone, Copy)]
pub enum CityLookup<'a> {
    Disabled,
    Enabled(&'a FacilityCatalog),
}

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Maximum straight-line distance to a city, in kilometers.
    pub city_radius_km: f64,
    /// Hubs routed per site; the shortest routed one wins.
    pub hub_candidates: usize,
    /// Search radius for highway access, in kilometers.
    pub highway_radius_km: f64,
    pub reference: Option<ReferencePoint>,
    pub pacing: PacingPolicy,
    /// Process sites on the rayon pool instead of sequentially.
    pub parallel: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            city_radius_km: DEFAULT_CITY_RADIUS_KM,
            hub_candidates: DEFAULT_HUB_CANDIDATES,
            highway_radius_km: DEFAULT_HIGHWAY_RADIUS_KM,
            reference: None,
            pacing: PacingPolicy::default(),
            parallel: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStep {
    Coordinates,
    Airport,
    Seaport,
    HighwayLookup,
    HighwayRoute,
    Reference,
    CityLookup,
    CityRoute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Error,
}

/// A note attached to one site's record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub step: EnrichmentStep,
    pub severity: Severity,
    pub message: String,
}

/// Nearest airport or seaport by routed distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubResult {
    pub name: String,
    pub code: Option<String>,
    #[serde(flatten)]
    pub route: RouteSummary,
}

/// Nearest highway access point. The route is absent if routing to it failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighwayResult {
    pub name: String,
    pub straight_km: f64,
    pub route: Option<RouteSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceResult {
    pub name: String,
    pub route: Option<RouteSummary>,
}

/// Nearest large city. Name and population are known once the lookup
/// succeeds; the route is absent if routing to it failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityResult {
    pub name: String,
    pub population: Option<u64>,
    pub route: Option<RouteSummary>,
}

/// One output row per input site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub project_id: String,
    pub site_id: String,
    pub site_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub airport: Option<HubResult>,
    pub seaport: Option<HubResult>,
    pub highway: Option<HighwayResult>,
    pub reference: Option<ReferenceResult>,
    pub city: Option<CityResult>,
    pub diagnostics: Vec<Diagnostic>,
}

impl EnrichedRecord {
    fn new(site: &Site) -> Self {
        Self {
            project_id: site.project_id.trim().to_string(),
            site_id: site.site_id.trim().to_string(),
            site_name: site.name.trim().to_string(),
            latitude: parse_degrees(site.latitude.as_deref()),
            longitude: parse_degrees(site.longitude.as_deref()),
            airport: None,
            seaport: None,
            highway: None,
            reference: None,
            city: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    fn note(&mut self, step: EnrichmentStep, message: String) {
        debug!(site = %self.site_name, ?step, %message, "enrichment note");
        self.diagnostics.push(Diagnostic {
            step,
            severity: Severity::Info,
            message,
        });
    }

    fn fail(&mut self, step: EnrichmentStep, message: String) {
        warn!(site = %self.site_name, ?step, error = %message, "enrichment step failed");
        self.diagnostics.push(Diagnostic {
            step,
            severity: Severity::Error,
            message,
        });
    }
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Completed records in input order. Shorter than the input only when cancelled.
    pub records: Vec<EnrichedRecord>,
    pub cancelled: bool,
    /// Routing service calls made during this batch.
    pub network_calls: usize,
    pub cache_hits: usize,
    /// Distinct routes held by the cache after the batch.
    pub cached_routes: usize,
    pub pauses: usize,
}

pub struct Enricher<'a, P> {
    cache: &'a RouteCache<P>,
    pacer: Pacer,
    cities: CityLookup<'a>,
    airports: Option<&'a FacilityCatalog>,
    seaports: Option<&'a FacilityCatalog>,
    highways: Option<&'a (dyn HighwayLocator + Sync)>,
    options: EnrichOptions,
}

impl<'a, P: RouteProvider> Enricher<'a, P> {
    pub fn new(cache: &'a RouteCache<P>, cities: CityLookup<'a>, options: EnrichOptions) -> Self {
        Self {
            cache,
            pacer: Pacer::new(options.pacing),
            cities,
            airports: None,
            seaports: None,
            highways: None,
            options,
        }
    }

    pub fn with_airports(mut self, airports: &'a FacilityCatalog) -> Self {
        self.airports = Some(airports);
        self
    }

    pub fn with_seaports(mut self, seaports: &'a FacilityCatalog) -> Self {
        self.seaports = Some(seaports);
        self
    }

    pub fn with_highways(mut self, locator: &'a (dyn HighwayLocator + Sync)) -> Self {
        self.highways = Some(locator);
        self
    }

    /// Builds the record for one site. Never fails; problems become diagnostics.
    pub fn enrich(&self, site: &Site) -> EnrichedRecord {
        let mut record = EnrichedRecord::new(site);

        let origin = match site.coordinate() {
            Ok(origin) => origin,
            Err(err) => {
                record.fail(EnrichmentStep::Coordinates, err.to_string());
                return record;
            }
        };

        if let Some(airports) = self.airports {
            let airport = self.nearest_hub(origin, airports, EnrichmentStep::Airport, &mut record);
            record.airport = airport;
        }
        if let Some(seaports) = self.seaports {
            let seaport = self.nearest_hub(origin, seaports, EnrichmentStep::Seaport, &mut record);
            record.seaport = seaport;
        }
        if let Some(locator) = self.highways {
            let highway = self.nearest_highway(origin, locator, &mut record);
            record.highway = highway;
        }
        if let Some(reference) = &self.options.reference {
            let route = match self.route(origin, reference.coordinate) {
                Ok(route) => Some(route),
                Err(err) => {
                    record.fail(EnrichmentStep::Reference, format!("{}: {}", reference.name, err));
                    None
                }
            };
            record.reference = Some(ReferenceResult {
                name: reference.name.clone(),
                route,
            });
        }
        if let CityLookup::Enabled(catalog) = self.cities {
            let city = self.nearest_city(origin, catalog, &mut record);
            record.city = city;
        }

        record
    }

    /// Routes the closest `hub_candidates` hubs and keeps the shortest by road.
    fn nearest_hub(
        &self,
        origin: Coordinate,
        hubs: &FacilityCatalog,
        step: EnrichmentStep,
        record: &mut EnrichedRecord,
    ) -> Option<HubResult> {
        if self.options.hub_candidates == 0 {
            record.note(step, "hub search skipped: zero candidates requested".to_string());
            return None;
        }

        let candidates = match NearestFacilityResolver::new(hubs).nearest_n(origin, self.options.hub_candidates) {
            Ok(candidates) => candidates,
            Err(err) => {
                record.fail(step, err.to_string());
                return None;
            }
        };

        let mut best: Option<HubResult> = None;
        for candidate in candidates {
            let hub = candidate.facility;
            match self.route(origin, hub.coordinate) {
                Ok(route) => {
                    let shorter = best
                        .as_ref()
                        .is_none_or(|current| route.distance_km < current.route.distance_km);
                    if shorter {
                        best = Some(HubResult {
                            name: hub.name.clone(),
                            code: hub.code.clone(),
                            route,
                        });
                    }
                }
                Err(err) => record.fail(step, format!("{}: {}", hub.name, err)),
            }
        }

        best
    }

    fn nearest_highway(
        &self,
        origin: Coordinate,
        locator: &dyn HighwayLocator,
        record: &mut EnrichedRecord,
    ) -> Option<HighwayResult> {
        let radius = self.options.highway_radius_km;
        let access = match locator.nearest_access(origin, radius) {
            Ok(Some(access)) => access,
            Ok(None) => {
                record.note(
                    EnrichmentStep::HighwayLookup,
                    format!("no highway access within {radius} km"),
                );
                return None;
            }
            Err(err) => {
                record.fail(EnrichmentStep::HighwayLookup, err.to_string());
                return None;
            }
        };

        let name = access.label();
        let route = match self.route(origin, access.coordinate) {
            Ok(route) => Some(route),
            Err(err) => {
                record.fail(EnrichmentStep::HighwayRoute, format!("{name}: {err}"));
                None
            }
        };

        Some(HighwayResult {
            name,
            straight_km: access.distance_km,
            route,
        })
    }

    fn nearest_city(
        &self,
        origin: Coordinate,
        catalog: &FacilityCatalog,
        record: &mut EnrichedRecord,
    ) -> Option<CityResult> {
        let radius = self.options.city_radius_km;
        let resolution = match NearestFacilityResolver::new(catalog).find_nearest(origin, radius) {
            Ok(resolution) => resolution,
            Err(err) => {
                record.fail(EnrichmentStep::CityLookup, err.to_string());
                return None;
            }
        };

        let Some(nearest) = resolution.found() else {
            record.note(
                EnrichmentStep::CityLookup,
                format!("no city found within {radius} km"),
            );
            return None;
        };

        let city = nearest.facility;
        let route = match self.route(origin, city.coordinate) {
            Ok(route) => {
                record.note(
                    EnrichmentStep::CityRoute,
                    format!(
                        "nearest city: {} ({:.1} km, {:.0} min)",
                        city.name, route.distance_km, route.duration_min
                    ),
                );
                Some(route)
            }
            Err(err) => {
                record.fail(EnrichmentStep::CityRoute, format!("{}: {}", city.name, err));
                None
            }
        };

        Some(CityResult {
            name: city.name.clone(),
            population: city.population.filter(|p| *p > 0),
            route,
        })
    }

    fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, RoutingError> {
        self.cache.route_paced(origin, destination, &self.pacer)
    }
}

impl<P: RouteProvider + Sync> Enricher<'_, P> {
    pub fn enrich_batch(&self, sites: &[Site]) -> BatchReport {
        self.enrich_batch_until(sites, &AtomicBool::new(false))
    }

    /// Like [`Enricher::enrich_batch`], but stops starting new sites once
    /// `cancel` is set. Records already produced are returned complete.
    pub fn enrich_batch_until(&self, sites: &[Site], cancel: &AtomicBool) -> BatchReport {
        let calls_before = self.cache.calls();
        let hits_before = self.cache.hits();
        let total = sites.len();
        info!(total, parallel = self.options.parallel, "enriching sites");

        let records: Vec<EnrichedRecord> = if self.options.parallel {
            sites
                .par_iter()
                .map(|site| (!cancel.load(Ordering::SeqCst)).then(|| self.enrich(site)))
                .collect::<Vec<_>>()
                .into_iter()
                .flatten()
                .collect()
        } else {
            let mut records = Vec::with_capacity(total);
            for site in sites {
                if cancel.load(Ordering::SeqCst) {
                    break;
                }
                records.push(self.enrich(site));
                debug!(processed = records.len(), total, "site enriched");
            }
            records
        };

        let cancelled = records.len() < total;
        let report = BatchReport {
            cancelled,
            network_calls: self.cache.calls() - calls_before,
            cache_hits: self.cache.hits() - hits_before,
            cached_routes: self.cache.len(),
            pauses: self.pacer.pauses(),
            records,
        };

        info!(
            processed = report.records.len(),
            total,
            cancelled,
            network_calls = report.network_calls,
            cache_hits = report.cache_hits,
            cached_routes = report.cached_routes,
            failed_sites = report.records.iter().filter(|r| r.has_errors()).count(),
            "batch finished"
        );

        report
    }
}
