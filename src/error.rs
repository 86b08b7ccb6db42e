//! Error types for each stage of the pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Failures reading or appending the coordinate store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access coordinate store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read coordinate store {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Failures talking to the geocoding service.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoding request for '{query}' failed: {source}")]
    Request {
        query: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Geocoding service returned status {status} for '{query}'")]
    Status { query: String, status: u16 },

    #[error("Geocoding service returned an invalid coordinate for '{query}': {value}")]
    InvalidCoordinate { query: String, value: String },

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Invalid geocoding endpoint '{0}'")]
    Endpoint(String),
}

/// Failures resolving the coordinate of a (city, country) pair.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No geocoding result for {city}, {country}")]
    NotFound { city: String, country: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}

/// Failures reading the input record list.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to open input file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Line {line}: expected at least 4 fields (city, country, continent, notes), found {found}")]
    MalformedRow { line: u64, found: usize },

    #[error("Line {line}: {source}")]
    Csv {
        line: u64,
        #[source]
        source: csv::Error,
    },
}

/// Failures loading the template or writing the output file.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to read template {path}: {source}")]
    ReadTemplate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read map data {path}: {source}")]
    ReadJson {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid map data: {0}")]
    Json(#[from] serde_json::Error),
}
