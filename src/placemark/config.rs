use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use placemark::aggregate::{MissPolicy, DEFAULT_INPUT_PATH};
use placemark::geocode::NOMINATIM_ENDPOINT;
use placemark::models::DEFAULT_COLOUR;
use placemark::render::DEFAULT_OUTPUT_PATH;
use placemark::store::DEFAULT_STORE_PATH;

use crate::Args;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub geocoder: GeocoderConfig,
    pub map: MapConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    /// Unset means `kml_maps.jinja2` if present, else the bundled template
    pub template: Option<PathBuf>,
    pub input: PathBuf,
    pub output: PathBuf,
    pub cache: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConfig {
    pub endpoint: String,
    /// Overridden by GEOLOCATOR_USER_AGENT
    pub user_agent: Option<String>,
    pub timeout_secs: u64,
    pub on_miss: MissPolicy,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub colour: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            template: None,
            input: PathBuf::from(DEFAULT_INPUT_PATH),
            output: PathBuf::from(DEFAULT_OUTPUT_PATH),
            cache: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: NOMINATIM_ENDPOINT.to_string(),
            user_agent: None,
            timeout_secs: 60,
            on_miss: MissPolicy::Abort,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            colour: DEFAULT_COLOUR.to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Command-line flags take precedence over the file
    pub fn with_args(mut self, args: &Args) -> Self {
        if let Some(template) = &args.template {
            self.paths.template = Some(template.clone());
        }
        if let Some(input) = &args.input {
            self.paths.input = input.clone();
        }
        if let Some(output) = &args.output {
            self.paths.output = output.clone();
        }
        if let Some(cache) = &args.cache {
            self.paths.cache = cache.clone();
        }
        if let Some(on_miss) = args.on_miss {
            self.geocoder.on_miss = on_miss;
        }
        self
    }
}
