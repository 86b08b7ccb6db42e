//! Core data models for the map generator.

pub mod grouped;
pub mod place;

pub use grouped::{CityDetails, ContinentGroup, GroupedMap, DEFAULT_COLOUR};
pub use place::{CacheEntry, Coordinate, PlaceRecord};
