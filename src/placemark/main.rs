//! Map generator.
//!
//! Reads a list of places, resolves their coordinates through the local
//! cache and Nominatim, groups them by continent and renders a KML file
//! ready to be imported into Google My Maps.

mod config;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use placemark::aggregate::{read_records, Aggregator, MissPolicy};
use placemark::coordinates::CoordinateService;
use placemark::geocode::{user_agent_from_env, NominatimGeocoder};
use placemark::render::{write_json, TemplateRenderer, DEFAULT_TEMPLATE_PATH};
use placemark::store::CoordinateStore;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "placemark")]
#[command(about = "Process place data and generate a KML file for Google My Maps")]
struct Args {
    /// Jinja2 template file [default: kml_maps.jinja2, or the bundled template]
    #[arg(long)]
    template: Option<PathBuf>,

    /// Input CSV file (city, country, continent, notes) [default: country_city.csv]
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output KML file [default: map_file_jk.kml]
    #[arg(long)]
    output: Option<PathBuf>,

    /// Coordinate cache file [default: city_country_data_base.csv]
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// What to do with places the geocoder cannot find
    #[arg(long, value_enum)]
    on_miss: Option<MissPolicy>,

    /// Also write the grouped map data as JSON next to the output
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    }
    .with_args(&args);

    let renderer = load_template(config.paths.template.as_deref())?;

    let store = CoordinateStore::new(&config.paths.cache);
    info!("Coordinate store: {}", store.path().display());
    for conflict in store
        .conflicts()
        .context("Failed to read coordinate store")?
    {
        warn!(
            "{}, {} is stored under several continents: {}",
            conflict.city,
            conflict.country,
            conflict.continents.join(", ")
        );
    }

    let user_agent = user_agent_from_env(config.geocoder.user_agent.as_deref());
    let geocoder = NominatimGeocoder::new(
        &config.geocoder.endpoint,
        &user_agent,
        Duration::from_secs(config.geocoder.timeout_secs),
    )
    .context("Failed to set up geocoder")?;

    let records = read_records(&config.paths.input)?;
    info!("Read {} places", records.len());

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );

    let mut aggregator = Aggregator::new(CoordinateService::new(store, geocoder))
        .with_colour(&config.map.colour)
        .with_miss_policy(config.geocoder.on_miss)
        .with_progress(pb);

    let map = aggregator
        .build_grouped_map(&records)
        .await
        .context("Failed to resolve coordinates")?;

    let stats = aggregator.service().stats();
    info!(
        "{} cache hits, {} geocoder queries ({} without result), {} new cache entries",
        stats.cache_hits, stats.geocode_queries, stats.geocode_misses, stats.store_writes
    );

    renderer
        .render_to_file(&map, &config.paths.output)
        .context("Failed to write output")?;

    if args.json {
        write_json(&map, config.paths.output.with_extension("json"))
            .context("Failed to write map data")?;
    }

    Ok(())
}

/// Explicit path, else `kml_maps.jinja2` in the working directory, else the bundled template
fn load_template(path: Option<&Path>) -> Result<TemplateRenderer> {
    let renderer = match path {
        Some(path) => TemplateRenderer::load(path)?,
        None if Path::new(DEFAULT_TEMPLATE_PATH).exists() => {
            TemplateRenderer::load(DEFAULT_TEMPLATE_PATH)?
        }
        None => {
            info!("No template given, using the bundled KML template");
            TemplateRenderer::builtin()?
        }
    };
    Ok(renderer)
}
