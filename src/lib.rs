//! Placemark - turns a list of places into a KML map for Google My Maps
//!
//! Coordinates are resolved through a local CSV cache, falling back to
//! Nominatim, then grouped by continent and rendered through a Jinja template.

pub mod aggregate;
pub mod coordinates;
pub mod error;
pub mod geocode;
pub mod models;
pub mod render;
pub mod store;

pub use models::{Coordinate, GroupedMap, PlaceRecord};
