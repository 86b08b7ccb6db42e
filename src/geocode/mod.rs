//! Geocoding: turning a free-text place description into coordinates.

mod nominatim;

use std::future::Future;

use crate::error::GeocodeError;
use crate::models::Coordinate;

pub use nominatim::{
    user_agent_from_env, NominatimGeocoder, DEFAULT_USER_AGENT, NOMINATIM_ENDPOINT,
    USER_AGENT_ENV,
};

/// External lookup service for place coordinates.
///
/// `Ok(None)` means the service answered but knows no such place.
pub trait Geocoder {
    fn geocode(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Option<Coordinate>, GeocodeError>> + Send;
}

/// Query string sent to the geocoder for a city
pub fn place_query(city: &str, country: &str) -> String {
    format!("{}, {}", city, country)
}
