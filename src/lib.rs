//! site-enrich core
//!
//! Enriches candidate site coordinates with routed distance/time to the
//! nearest airport, seaport, highway access, reference location, and large city.

pub mod traits;
pub mod coordinate;
pub mod error;
pub mod haversine;
pub mod catalog;
pub mod resolver;
pub mod osrm;
pub mod highway;
pub mod cache;
pub mod pacing;
pub mod enrich;
pub mod input;
