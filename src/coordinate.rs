//! Geographic coordinate value type.

use serde::{Deserialize, Serialize};

use crate::error::InvalidInputError;

/// Default number of decimal degrees kept when quantizing (~0.1 m).
pub const DEFAULT_PRECISION: u32 = 6;

/// Finest supported quantization. `180 * 10^9` still fits an `i64` with room
/// to spare; past ~18 digits every coordinate would saturate to the same key.
pub const MAX_PRECISION: u32 = 9;

/// A (latitude, longitude) pair in decimal degrees.
///
/// Fields are public so fixtures can build coordinates directly; anything that
/// computes with a coordinate validates it first via [`Coordinate::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Builds a validated coordinate from optional parts, as read from input tables.
    pub fn try_from_parts(lat: Option<f64>, lon: Option<f64>) -> Result<Self, InvalidInputError> {
        match (lat, lon) {
            (Some(lat), Some(lon)) => {
                let coord = Self::new(lat, lon);
                coord.validate()?;
                Ok(coord)
            }
            _ => Err(InvalidInputError::MissingCoordinate),
        }
    }

    /// Builds a validated coordinate from raw table cells.
    ///
    /// Blank or absent cells are [`InvalidInputError::MissingCoordinate`];
    /// text that is not a number is reported as-is.
    pub fn parse_parts(lat: Option<&str>, lon: Option<&str>) -> Result<Self, InvalidInputError> {
        let lat = parse_cell(lat)?;
        let lon = parse_cell(lon)?;
        Self::try_from_parts(lat, lon)
    }

    /// Checks that both parts are finite and within [-90, 90] / [-180, 180].
    pub fn validate(&self) -> Result<(), InvalidInputError> {
        let Self { lat, lon } = *self;
        if !lat.is_finite() || !lon.is_finite() {
            return Err(InvalidInputError::NonFinite { lat, lon });
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(InvalidInputError::OutOfRange { lat, lon });
        }
        Ok(())
    }

    /// Rounds both parts to `precision` decimal places as fixed-point integers.
    ///
    /// `precision` is capped at [`MAX_PRECISION`].
    pub fn quantize(&self, precision: u32) -> (i64, i64) {
        let scale = 10f64.powi(precision.min(MAX_PRECISION) as i32);
        (
            (self.lat * scale).round() as i64,
            (self.lon * scale).round() as i64,
        )
    }

    /// Inverse of [`Coordinate::quantize`].
    pub fn from_quantized((lat, lon): (i64, i64), precision: u32) -> Self {
        let scale = 10f64.powi(precision.min(MAX_PRECISION) as i32);
        Self::new(lat as f64 / scale, lon as f64 / scale)
    }
}

fn parse_cell(cell: Option<&str>) -> Result<Option<f64>, InvalidInputError> {
    match cell.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(None),
        Some(text) => text
            .parse()
            .map(Some)
            .map_err(|_| InvalidInputError::Unparseable(text.to_string())),
    }
}
