//! Nearest-facility resolution by exhaustive great-circle scan.
//!
//! The catalogs this serves hold a few hundred points, so a linear scan is
//! cheaper than maintaining a spatial index.

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::catalog::{Facility, FacilityCatalog};
use crate::coordinate::Coordinate;
use crate::error::InvalidInputError;
use crate::haversine::haversine_km;

/// Distances closer than this are treated as ties.
pub const TIE_TOLERANCE_KM: f64 = 1e-9;

/// A facility together with its straight-line distance from the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest<'a> {
    pub facility: &'a Facility,
    pub distance_km: f64,
}

/// Outcome of a nearest-facility lookup. `NotFound` is a normal outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    NotFound,
    Found(Nearest<'a>),
}

impl<'a> Resolution<'a> {
    pub fn found(self) -> Option<Nearest<'a>> {
        match self {
            Resolution::Found(nearest) => Some(nearest),
            Resolution::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

impl Serialize for Nearest<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Nearest", 5)?;
        state.serialize_field("name", &self.facility.name)?;
        state.serialize_field("lat", &self.facility.coordinate.lat)?;
        state.serialize_field("lon", &self.facility.coordinate.lon)?;
        state.serialize_field("population", &self.facility.population)?;
        state.serialize_field("distance_km", &self.distance_km)?;
        state.end()
    }
}

/// `NotFound` serializes as `null`, otherwise the flat facility shape.
impl Serialize for Resolution<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Resolution::NotFound => serializer.serialize_none(),
            Resolution::Found(nearest) => serializer.serialize_some(nearest),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NearestFacilityResolver<'a> {
    catalog: &'a FacilityCatalog,
}

impl<'a> NearestFacilityResolver<'a> {
    pub fn new(catalog: &'a FacilityCatalog) -> Self {
        Self { catalog }
    }

    /// Closest facility within `max_radius_km` of `query`.
    ///
    /// Equidistant facilities resolve to the earliest in catalog order.
    pub fn find_nearest(
        &self,
        query: Coordinate,
        max_radius_km: f64,
    ) -> Result<Resolution<'a>, InvalidInputError> {
        query.validate()?;
        if !(max_radius_km > 0.0) {
            return Err(InvalidInputError::InvalidRadius(max_radius_km));
        }

        let mut best: Option<Nearest<'a>> = None;
        for facility in self.catalog.all() {
            let distance_km = haversine_km(query, facility.coordinate);
            if !(distance_km <= max_radius_km) {
                continue;
            }
            let closer = match best {
                Some(current) => distance_km < current.distance_km - TIE_TOLERANCE_KM,
                None => true,
            };
            if closer {
                best = Some(Nearest {
                    facility,
                    distance_km,
                });
            }
        }

        Ok(best.map_or(Resolution::NotFound, Resolution::Found))
    }

    /// Up to `n` closest facilities, nearest first, regardless of radius.
    ///
    /// Used to pick routing candidates; ties keep catalog order.
    pub fn nearest_n(&self, query: Coordinate, n: usize) -> Result<Vec<Nearest<'a>>, InvalidInputError> {
        query.validate()?;

        let mut candidates: Vec<Nearest<'a>> = self
            .catalog
            .all()
            .map(|facility| Nearest {
                facility,
                distance_km: haversine_km(query, facility.coordinate),
            })
            .collect();
        candidates.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        candidates.truncate(n);

        Ok(candidates)
    }
}
