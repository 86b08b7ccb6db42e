//! Coordinate resolution: store first, geocoder on miss.

mod service;

pub use service::{CoordinateService, ResolveStats};
