//! Nominatim (OpenStreetMap) search client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use super::Geocoder;
use crate::error::GeocodeError;
use crate::models::Coordinate;

pub const NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org";
/// Environment variable holding the client identifier sent as User-Agent
pub const USER_AGENT_ENV: &str = "GEOLOCATOR_USER_AGENT";
pub const DEFAULT_USER_AGENT: &str = "default_user_agent";

/// Resolve the client identifier: environment first, then `fallback`, then the default.
pub fn user_agent_from_env(fallback: Option<&str>) -> String {
    std::env::var(USER_AGENT_ENV)
        .ok()
        .filter(|ua| !ua.trim().is_empty())
        .or_else(|| fallback.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl SearchResult {
    fn coordinate(&self, query: &str) -> Result<Coordinate, GeocodeError> {
        let parse = |value: &str| {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| GeocodeError::InvalidCoordinate {
                    query: query.to_string(),
                    value: value.to_string(),
                })
        };
        Ok(Coordinate::new(parse(&self.lat)?, parse(&self.lon)?))
    }
}

/// Geocoder backed by a Nominatim `/search` endpoint
pub struct NominatimGeocoder {
    client: Client,
    search_url: Url,
}

impl NominatimGeocoder {
    pub fn new(endpoint: &str, user_agent: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        let mut base =
            Url::parse(endpoint).map_err(|_| GeocodeError::Endpoint(endpoint.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let search_url = base
            .join("search")
            .map_err(|_| GeocodeError::Endpoint(endpoint.to_string()))?;

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(GeocodeError::Client)?;

        Ok(Self { client, search_url })
    }

    /// Full request URL for a query
    pub fn search_url(&self, query: &str) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "json")
            .append_pair("limit", "1");
        url
    }

    async fn search(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let request_error = |source| GeocodeError::Request {
            query: query.to_string(),
            source,
        };

        let response = self
            .client
            .get(self.search_url(query))
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status {
                query: query.to_string(),
                status: response.status().as_u16(),
            });
        }

        let results: Vec<SearchResult> = response.json().await.map_err(request_error)?;

        match results.first() {
            Some(first) => {
                let coordinate = first.coordinate(query)?;
                debug!(
                    "Nominatim matched '{}' to {} at {}",
                    query,
                    first.display_name.as_deref().unwrap_or("?"),
                    coordinate
                );
                Ok(Some(coordinate))
            }
            None => Ok(None),
        }
    }
}

impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError> {
        info!("Querying Nominatim for '{}'", query);
        self.search(query).await
    }
}
