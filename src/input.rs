//! CSV tables: candidate sites, airports, seaports.
//!
//! Column headers follow the site-selection templates (`Site Name`,
//! `Latitude`, ...). Rows with unusable coordinates are kept for sites (they
//! surface as per-site diagnostics) and dropped for hubs.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::catalog::{FacilityCatalog, FacilityRecord};
use crate::enrich::Site;
use crate::error::InputError;

#[derive(Debug, Deserialize)]
struct AirportRow {
    #[serde(rename = "Airport Name", default)]
    name: Option<String>,
    #[serde(rename = "IATA", default)]
    iata: Option<String>,
    #[serde(rename = "ICAO", default)]
    icao: Option<String>,
    #[serde(rename = "Latitude", default, deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(rename = "Longitude", default, deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
}

impl From<AirportRow> for FacilityRecord {
    fn from(row: AirportRow) -> Self {
        let iata = row.iata.filter(|c| !c.trim().is_empty());
        FacilityRecord {
            name: row.name,
            code: iata.or(row.icao),
            lat: row.latitude,
            lon: row.longitude,
            pop: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SeaportRow {
    #[serde(rename = "Seaport Name", default)]
    name: Option<String>,
    #[serde(rename = "Latitude", default, deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(rename = "Longitude", default, deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
}

impl From<SeaportRow> for FacilityRecord {
    fn from(row: SeaportRow) -> Self {
        FacilityRecord {
            name: row.name,
            code: None,
            lat: row.latitude,
            lon: row.longitude,
            pop: None,
        }
    }
}

pub fn read_sites(path: impl AsRef<Path>) -> Result<Vec<Site>, InputError> {
    let path = path.as_ref();
    let mut reader = csv_reader(path)?;
    let sites: Vec<Site> = reader
        .deserialize()
        .collect::<Result<_, _>>()
        .map_err(|source| InputError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    info!(path = %path.display(), sites = sites.len(), "loaded sites");
    Ok(sites)
}

pub fn read_airports(path: impl AsRef<Path>) -> Result<FacilityCatalog, InputError> {
    read_hubs::<AirportRow>(path.as_ref(), "airports")
}

pub fn read_seaports(path: impl AsRef<Path>) -> Result<FacilityCatalog, InputError> {
    read_hubs::<SeaportRow>(path.as_ref(), "seaports")
}

fn read_hubs<T>(path: &Path, kind: &str) -> Result<FacilityCatalog, InputError>
where
    T: for<'de> Deserialize<'de> + Into<FacilityRecord>,
{
    let mut reader = csv_reader(path)?;
    let rows: Vec<T> = reader
        .deserialize()
        .collect::<Result<_, _>>()
        .map_err(|source| InputError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    let catalog = FacilityCatalog::from_records(kind, rows.into_iter().map(Into::into))?;
    info!(path = %path.display(), kind, hubs = catalog.len(), skipped = catalog.skipped(), "loaded hubs");
    Ok(catalog)
}

fn csv_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, InputError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| InputError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use crate::error::InvalidInputError;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_sites_keep_bad_coordinates() {
        let file = write_temp(
            "Project ID,Site ID,Site Name,Latitude,Longitude\n\
             P1,S1,Warsaw Site,52.2297,21.0122\n\
             P1,S2,Broken Site,n/a,21.0\n",
        );
        let sites = read_sites(file.path()).unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].project_id, "P1");
        assert_eq!(sites[0].coordinate().unwrap().lat, 52.2297);
        assert_eq!(sites[1].latitude.as_deref(), Some("n/a"));
        assert_eq!(
            sites[1].coordinate(),
            Err(InvalidInputError::Unparseable("n/a".to_string()))
        );
    }

    #[test]
    fn test_sites_optional_id_columns() {
        let file = write_temp("Site Name,Latitude,Longitude\nOnly Name,50.0,19.9\n");
        let sites = read_sites(file.path()).unwrap();
        assert_eq!(sites[0].site_id, "");
        assert_eq!(sites[0].name, "Only Name");
    }

    #[test]
    fn test_airports_prefer_iata_then_icao() {
        let file = write_temp(
            "Airport Name,IATA,ICAO,Latitude,Longitude\n\
             Warsaw Chopin,WAW,EPWA,52.1657,20.9671\n\
             Modlin,,EPMO,52.4511,20.6518\n\
             Ghost Field,,,,\n",
        );
        let airports = read_airports(file.path()).unwrap();
        assert_eq!(airports.len(), 2);
        assert_eq!(airports.skipped(), 1);
        let codes: Vec<_> = airports.all().map(|a| a.code.clone()).collect();
        assert_eq!(codes, vec![Some("WAW".to_string()), Some("EPMO".to_string())]);
    }

    #[test]
    fn test_seaports() {
        let file = write_temp("Seaport Name,Latitude,Longitude\nPort of Gdańsk,54.3954,18.6684\n");
        let seaports = read_seaports(file.path()).unwrap();
        assert_eq!(seaports.region("seaports")[0].name, "Port of Gdańsk");
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(read_sites("/no/such/sites.csv"), Err(InputError::Csv { .. })));
    }

    #[test]
    fn test_empty_hub_table_is_data_error() {
        let file = write_temp("Seaport Name,Latitude,Longitude\n");
        assert!(matches!(read_seaports(file.path()), Err(InputError::Data(_))));
    }
}
