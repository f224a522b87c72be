//! Domain types shared by the directory, geocoding and session modules.

pub mod filters;
pub mod geo;
pub mod query;
pub mod user;
