//! Error taxonomy for catalog loading, query validation, routing, and highway lookup.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The facility catalog could not be loaded.
///
/// Fatal to startup of the feature that needs the catalog; callers may choose
/// to run with that feature disabled instead.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read facility definition {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed facility definition: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("facility definition contains no usable entries ({skipped} skipped)")]
    Empty { skipped: usize },
}

/// A query coordinate or parameter was unusable. Fatal to a single request only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInputError {
    #[error("coordinate is missing")]
    MissingCoordinate,

    #[error("coordinate {0:?} is not a number")]
    Unparseable(String),

    #[error("coordinate ({lat}, {lon}) is not finite")]
    NonFinite { lat: f64, lon: f64 },

    #[error("coordinate ({lat}, {lon}) is out of range")]
    OutOfRange { lat: f64, lon: f64 },

    #[error("search radius must be positive, got {0} km")]
    InvalidRadius(f64),
}

/// A call to the routing collaborator failed.
///
/// Never cached and never retried in place; the next independent request for
/// the same pair tries again.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("routing request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("routing service returned HTTP {0}")]
    Status(u16),

    #[error("routing service error {code}: {message}")]
    Service { code: String, message: String },

    #[error("routing service returned no route")]
    NoRoute,

    #[error("failed to parse routing response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid route endpoint: {0}")]
    InvalidEndpoint(#[from] InvalidInputError),
}

/// The highway-access lookup failed. Fatal to that step of one site only.
#[derive(Debug, Error)]
pub enum HighwayError {
    #[error("highway lookup request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("highway lookup service returned HTTP {0}")]
    Status(u16),

    #[error("failed to parse highway lookup response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid highway lookup origin: {0}")]
    InvalidOrigin(#[from] InvalidInputError),
}

/// Errors reading site or hub tables.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Data(#[from] DataError),
}
