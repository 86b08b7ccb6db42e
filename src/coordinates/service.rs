//! Cache-through coordinate lookup.

use hashbrown::HashSet;
use tracing::{info, warn};

use crate::error::ResolveError;
use crate::geocode::{place_query, Geocoder};
use crate::models::{CacheEntry, Coordinate};
use crate::store::CoordinateStore;

/// Counters for one run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolveStats {
    pub cache_hits: usize,
    pub geocode_queries: usize,
    pub geocode_misses: usize,
    pub store_writes: usize,
}

/// Resolves `(city, country)` pairs through the coordinate store, falling back
/// to the geocoder and writing its answers back to the store.
///
/// Each pair is sent to the geocoder at most once per service instance; pairs
/// the geocoder could not place are remembered and not queried again.
pub struct CoordinateService<G> {
    store: CoordinateStore,
    geocoder: G,
    misses: HashSet<(String, String)>,
    stats: ResolveStats,
}

impl<G: Geocoder> CoordinateService<G> {
    pub fn new(store: CoordinateStore, geocoder: G) -> Self {
        Self {
            store,
            geocoder,
            misses: HashSet::new(),
            stats: ResolveStats::default(),
        }
    }

    /// Coordinates for a city, recording `continent` if the geocoder is consulted
    pub async fn get_coordinates(
        &mut self,
        city: &str,
        country: &str,
        continent: &str,
    ) -> Result<Coordinate, ResolveError> {
        let city = city.trim();
        let country = country.trim();

        if let Some(coordinate) = self.store.lookup(city, country)? {
            info!("Reading info about {}, {} from store", city, country);
            self.stats.cache_hits += 1;
            return Ok(coordinate);
        }

        let key = (city.to_string(), country.to_string());
        if self.misses.contains(&key) {
            return Err(not_found(city, country));
        }

        info!("Getting info about {}, {} from geocoder", city, country);
        self.stats.geocode_queries += 1;
        let Some(coordinate) = self.geocoder.geocode(&place_query(city, country)).await? else {
            warn!("Geocoder has no result for {}, {}", city, country);
            self.stats.geocode_misses += 1;
            self.misses.insert(key);
            return Err(not_found(city, country));
        };

        self.store
            .append(&CacheEntry::new(city, country, continent, coordinate))?;
        self.stats.store_writes += 1;

        Ok(coordinate)
    }

    pub fn stats(&self) -> ResolveStats {
        self.stats
    }

    pub fn store(&self) -> &CoordinateStore {
        &self.store
    }

    pub fn geocoder(&self) -> &G {
        &self.geocoder
    }
}

fn not_found(city: &str, country: &str) -> ResolveError {
    ResolveError::NotFound {
        city: city.to_string(),
        country: country.to_string(),
    }
}
