//! Test fixtures for site-enrich.
//!
//! Provides realistic test data including:
//! - Real Polish site, airport, seaport and city locations
//! - Mock route providers with call counting and scripted failures

pub mod polish_locations;
pub mod routers;

pub use polish_locations::*;
pub use routers::*;
