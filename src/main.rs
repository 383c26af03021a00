use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use site_enrich::cache::RouteCache;
use site_enrich::catalog::FacilityCatalog;
use site_enrich::coordinate::Coordinate;
use site_enrich::enrich::{CityLookup, EnrichOptions, Enricher, ReferencePoint};
use site_enrich::haversine::HaversineRouter;
use site_enrich::highway::{OverpassClient, OverpassConfig};
use site_enrich::input::{read_airports, read_seaports, read_sites};
use site_enrich::osrm::{OsrmClient, OsrmConfig};
use site_enrich::pacing::PacingPolicy;
use site_enrich::traits::RouteProvider;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Enrich candidate sites with routed distances to airports, seaports,
/// highway access, a reference location, and the nearest city with 100k+
/// inhabitants.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Sites CSV with columns Project ID, Site ID, Site Name, Latitude, Longitude
    sites: PathBuf,

    /// Airports CSV with columns Airport Name, IATA, ICAO, Latitude, Longitude
    #[arg(long)]
    airports: Option<PathBuf>,

    /// Seaports CSV with columns Seaport Name, Latitude, Longitude
    #[arg(long)]
    seaports: Option<PathBuf>,

    /// City definition JSON (defaults to the bundled EU cities)
    #[arg(long, conflicts_with = "no_cities")]
    cities: Option<PathBuf>,

    /// Skip nearest-city enrichment
    #[arg(long)]
    no_cities: bool,

    /// Maximum straight-line distance to a city, in km
    #[arg(long, default_value_t = 200.0)]
    city_radius_km: f64,

    /// Hubs routed per site after straight-line pre-filtering
    #[arg(long, default_value_t = 3)]
    top_n: usize,

    /// Look up the nearest highway access via Overpass
    #[arg(long)]
    highways: bool,

    /// Highway access search radius, in km
    #[arg(long, default_value_t = 50.0)]
    highway_radius_km: f64,

    /// Overpass API endpoint
    #[arg(long, env = "OVERPASS_URL", default_value = "https://overpass-api.de/api/interpreter")]
    overpass_url: String,

    /// Reference location as NAME:LAT,LON (e.g. "Warsaw:52.2297,21.0122")
    #[arg(long, value_parser = parse_reference)]
    reference: Option<ReferencePoint>,

    /// OSRM base URL
    #[arg(long, env = "OSRM_URL", default_value = "https://router.project-osrm.org")]
    osrm_url: String,

    /// OSRM routing profile
    #[arg(long, env = "OSRM_PROFILE", default_value = "driving")]
    osrm_profile: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 20)]
    timeout_secs: u64,

    /// Estimate routes from straight-line distance instead of calling OSRM
    #[arg(long)]
    offline: bool,

    /// Pause after every N routing calls (0 disables)
    #[arg(long, default_value_t = 0)]
    pause_every: usize,

    /// Pause length in seconds
    #[arg(long, default_value = "1", value_parser = parse_seconds)]
    pause_secs: Duration,

    /// Process sites in parallel
    #[arg(long)]
    parallel: bool,

    /// Output JSON path (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn parse_reference(value: &str) -> Result<ReferencePoint, String> {
    let (name, coords) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected NAME:LAT,LON, got {value:?}"))?;
    let (lat, lon) = coords
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got {coords:?}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude: {e}"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("longitude: {e}"))?;

    let coordinate = Coordinate::new(lat, lon);
    coordinate.validate().map_err(|e| e.to_string())?;

    Ok(ReferencePoint {
        name: name.trim().to_string(),
        coordinate,
    })
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value.trim().parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{value:?}: {e}"))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let cli = Cli::parse();

    let sites = read_sites(&cli.sites)?;
    let airports = cli.airports.as_ref().map(|path| read_airports(path)).transpose()?;
    let seaports = cli.seaports.as_ref().map(|path| read_seaports(path)).transpose()?;

    let cities = if cli.no_cities {
        None
    } else {
        let loaded = match &cli.cities {
            Some(path) => FacilityCatalog::from_path(path),
            None => FacilityCatalog::load(),
        };
        match loaded {
            Ok(catalog) => Some(catalog),
            Err(err) => {
                warn!(error = %err, "city catalog unavailable; nearest-city enrichment disabled");
                None
            }
        }
    };
    let city_lookup = cities.as_ref().map_or(CityLookup::Disabled, CityLookup::Enabled);

    let provider: Box<dyn RouteProvider + Send + Sync> = if cli.offline {
        warn!("offline mode: travel figures are straight-line estimates");
        Box::new(HaversineRouter::default())
    } else {
        Box::new(OsrmClient::new(OsrmConfig {
            base_url: cli.osrm_url.clone(),
            profile: cli.osrm_profile.clone(),
            timeout_secs: cli.timeout_secs,
        })?)
    };
    let cache = RouteCache::new(provider);

    let highways = if cli.highways {
        Some(OverpassClient::new(OverpassConfig {
            url: cli.overpass_url.clone(),
            ..OverpassConfig::default()
        })?)
    } else {
        None
    };

    let options = EnrichOptions {
        city_radius_km: cli.city_radius_km,
        hub_candidates: cli.top_n,
        highway_radius_km: cli.highway_radius_km,
        reference: cli.reference.clone(),
        pacing: PacingPolicy {
            every: cli.pause_every,
            pause: cli.pause_secs,
        },
        parallel: cli.parallel,
    };

    let mut enricher = Enricher::new(&cache, city_lookup, options);
    if let Some(airports) = &airports {
        enricher = enricher.with_airports(airports);
    }
    if let Some(seaports) = &seaports {
        enricher = enricher.with_seaports(seaports);
    }
    if let Some(highways) = &highways {
        enricher = enricher.with_highways(highways);
    }

    let report = enricher.enrich_batch(&sites);
    info!(
        "Analysis complete: {} sites, {} routing calls, {} cached routes",
        report.records.len(),
        report.network_calls,
        report.cached_routes
    );

    let writer: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, &report.records)?;
    writeln!(writer)?;
    writer.flush()?;

    if let Some(path) = &cli.output {
        info!("Results written to {}", path.display());
    }

    Ok(())
}
