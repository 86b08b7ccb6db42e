//! Flat place records and the coordinates resolved for them.

use serde::{Deserialize, Serialize};

/// One row of the input list: a city with its country, continent and notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceRecord {
    pub city: String,
    pub country: String,
    pub continent: String,
    pub notes: String,
    /// 1-based line in the source file, for diagnostics
    pub line: u64,
}

impl PlaceRecord {
    /// Create a record, trimming surrounding whitespace from every field
    pub fn new(city: &str, country: &str, continent: &str, notes: &str) -> Self {
        Self {
            city: city.trim().to_string(),
            country: country.trim().to_string(),
            continent: continent.trim().to_string(),
            notes: notes.trim().to_string(),
            line: 0,
        }
    }

    pub fn at_line(mut self, line: u64) -> Self {
        self.line = line;
        self
    }
}

/// Geographic point (lat/lon)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// A resolved place as persisted in the coordinate store.
///
/// Identity is `(city, country)`, compared exactly after trimming.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub city: String,
    pub country: String,
    pub continent: String,
    pub coordinate: Coordinate,
}

impl CacheEntry {
    pub fn new(city: &str, country: &str, continent: &str, coordinate: Coordinate) -> Self {
        Self {
            city: city.trim().to_string(),
            country: country.trim().to_string(),
            continent: continent.trim().to_string(),
            coordinate,
        }
    }

    /// Whether this entry is stored under the given key
    pub fn matches(&self, city: &str, country: &str) -> bool {
        self.city == city.trim() && self.country == country.trim()
    }
}
