//! Grouping flat place records into the continent → city map.

mod input;

use hashbrown::HashSet;
use indicatif::ProgressBar;
use serde::Deserialize;
use tracing::{info, warn};

use crate::coordinates::CoordinateService;
use crate::error::ResolveError;
use crate::geocode::Geocoder;
use crate::models::{CityDetails, GroupedMap, PlaceRecord, DEFAULT_COLOUR};

pub use input::{read_records, records_from_reader, DEFAULT_INPUT_PATH};

/// What to do with a record the geocoder cannot place
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissPolicy {
    /// Fail the run
    #[default]
    Abort,
    /// Drop the record and keep going
    Skip,
}

/// Distinct values seen while building a map
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AggregateSummary {
    pub cities: usize,
    pub countries: usize,
    pub continents: usize,
    pub placemarks: usize,
    pub duplicates: usize,
    pub unresolved: usize,
}

/// Builds a [`GroupedMap`] from place records, resolving each one's coordinates.
pub struct Aggregator<G> {
    service: CoordinateService<G>,
    colour: String,
    on_miss: MissPolicy,
    progress: ProgressBar,
    summary: AggregateSummary,
}

impl<G: Geocoder> Aggregator<G> {
    pub fn new(service: CoordinateService<G>) -> Self {
        Self {
            service,
            colour: DEFAULT_COLOUR.to_string(),
            on_miss: MissPolicy::default(),
            progress: ProgressBar::hidden(),
            summary: AggregateSummary::default(),
        }
    }

    /// Placemark style written to every city
    pub fn with_colour(mut self, colour: &str) -> Self {
        self.colour = colour.to_string();
        self
    }

    pub fn with_miss_policy(mut self, on_miss: MissPolicy) -> Self {
        self.on_miss = on_miss;
        self
    }

    /// Progress bar ticked once per record
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Resolve every record in order and group them by continent and city.
    ///
    /// The first record for a `(continent, city)` pair decides its notes;
    /// later records for the same pair are still resolved but not inserted.
    pub async fn build_grouped_map(
        &mut self,
        records: &[PlaceRecord],
    ) -> Result<GroupedMap, ResolveError> {
        let mut map = GroupedMap::new();
        let mut cities = HashSet::new();
        let mut countries = HashSet::new();
        let mut continents = HashSet::new();
        let mut summary = AggregateSummary::default();

        for record in records {
            self.progress.inc(1);

            let city = record.city.trim();
            let country = record.country.trim();
            let continent = record.continent.trim();
            let notes = record.notes.trim();

            let coordinate = match self.service.get_coordinates(city, country, continent).await {
                Ok(coordinate) => coordinate,
                Err(ResolveError::NotFound { .. }) if self.on_miss == MissPolicy::Skip => {
                    warn!(
                        "Skipping {}, {} (line {}): no coordinates found",
                        city, country, record.line
                    );
                    summary.unresolved += 1;
                    continue;
                }
                Err(e) => {
                    self.progress.abandon();
                    return Err(e);
                }
            };

            cities.insert(city.to_string());
            countries.insert(country.to_string());
            continents.insert(continent.to_string());

            let details = CityDetails::new(notes, coordinate, &self.colour);
            if !map.insert(continent, city, details) {
                summary.duplicates += 1;
            }
        }

        self.progress.finish();

        summary.cities = cities.len();
        summary.countries = countries.len();
        summary.continents = continents.len();
        summary.placemarks = map.len();

        info!(
            "Processed {} cities, {} countries, {} continents.",
            summary.cities, summary.countries, summary.continents
        );
        if summary.unresolved > 0 {
            warn!("{} records had no coordinates and were skipped", summary.unresolved);
        }

        self.summary = summary;
        Ok(map)
    }

    /// Summary of the last [`Aggregator::build_grouped_map`] call
    pub fn summary(&self) -> &AggregateSummary {
        &self.summary
    }

    pub fn service(&self) -> &CoordinateService<G> {
        &self.service
    }
}
