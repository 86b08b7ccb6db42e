//! Append-only coordinate cache backed by a CSV file.
//!
//! Rows are `city,country,continent,latitude,longitude` with no header.
//! The file is opened per operation and every lookup scans it from the start,
//! so entries appended earlier in a run are visible to later lookups.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder, WriterBuilder};
use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{CacheEntry, Coordinate};

/// Default cache file name, relative to the working directory
pub const DEFAULT_STORE_PATH: &str = "city_country_data_base.csv";

/// A `(city, country)` key stored with more than one continent label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConflict {
    pub city: String,
    pub country: String,
    pub continents: Vec<String>,
}

/// Flat-file coordinate store
#[derive(Debug, Clone)]
pub struct CoordinateStore {
    path: PathBuf,
}

impl CoordinateStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Find the first stored coordinate for `(city, country)`.
    ///
    /// A missing store file is an empty cache.
    pub fn lookup(&self, city: &str, country: &str) -> Result<Option<Coordinate>, StoreError> {
        let Some(mut reader) = self.open_reader()? else {
            return Ok(None);
        };

        let city = city.trim();
        let country = country.trim();

        for (idx, result) in reader.byte_records().enumerate() {
            let record = result.map_err(|source| self.csv_error(source))?;
            if field(&record, 0) != Some(city) || field(&record, 1) != Some(country) {
                continue;
            }

            match parse_entry(&record) {
                Some(entry) => {
                    debug!("{}, {} found in store", city, country);
                    return Ok(Some(entry.coordinate));
                }
                None => warn!(
                    "Skipping malformed row {} in {}: {:?}",
                    idx + 1,
                    self.path.display(),
                    record
                ),
            }
        }

        Ok(None)
    }

    /// Append an entry at the end of the store and sync it to disk.
    ///
    /// Existing entries with the same key are left alone.
    pub fn append(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let needs_newline = self.missing_trailing_newline()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;

        if needs_newline {
            file.write_all(b"\n")
                .map_err(|source| self.io_error(source))?;
        }

        let latitude = entry.coordinate.latitude.to_string();
        let longitude = entry.coordinate.longitude.to_string();

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer
            .write_record([
                entry.city.as_str(),
                entry.country.as_str(),
                entry.continent.as_str(),
                latitude.as_str(),
                longitude.as_str(),
            ])
            .map_err(|source| self.csv_error(source))?;
        writer.flush().map_err(|source| self.io_error(source))?;
        writer
            .get_ref()
            .sync_data()
            .map_err(|source| self.io_error(source))?;

        debug!(
            "Stored {}, {} ({}) at {}",
            entry.city, entry.country, entry.continent, entry.coordinate
        );
        Ok(())
    }

    /// All well-formed entries, in file order
    pub fn entries(&self) -> Result<Vec<CacheEntry>, StoreError> {
        let Some(mut reader) = self.open_reader()? else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for (idx, result) in reader.byte_records().enumerate() {
            let record = result.map_err(|source| self.csv_error(source))?;
            match parse_entry(&record) {
                Some(entry) => entries.push(entry),
                None => warn!(
                    "Skipping malformed row {} in {}: {:?}",
                    idx + 1,
                    self.path.display(),
                    record
                ),
            }
        }
        Ok(entries)
    }

    /// Keys stored with differing continent labels.
    ///
    /// The store is never rewritten; this only reports the inconsistency.
    pub fn conflicts(&self) -> Result<Vec<StoreConflict>, StoreError> {
        let mut order: Vec<(String, String)> = Vec::new();
        let mut labels: HashMap<(String, String), Vec<String>> = HashMap::new();

        for entry in self.entries()? {
            let key = (entry.city, entry.country);
            let continents = labels.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                Vec::new()
            });
            if !continents.contains(&entry.continent) {
                continents.push(entry.continent);
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|key| {
                let continents = labels.remove(&key)?;
                (continents.len() > 1).then(|| StoreConflict {
                    city: key.0,
                    country: key.1,
                    continents,
                })
            })
            .collect())
    }

    fn open_reader(&self) -> Result<Option<csv::Reader<File>>, StoreError> {
        match File::open(&self.path) {
            Ok(file) => Ok(Some(
                ReaderBuilder::new()
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(file),
            )),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Coordinate store {} not found", self.path.display());
                Ok(None)
            }
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn missing_trailing_newline(&self) -> Result<bool, StoreError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(source) => return Err(self.io_error(source)),
        };

        let len = file
            .metadata()
            .map_err(|source| self.io_error(source))?
            .len();
        if len == 0 {
            return Ok(false);
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))
            .and_then(|_| file.read_exact(&mut last))
            .map_err(|source| self.io_error(source))?;
        Ok(last[0] != b'\n')
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> StoreError {
        StoreError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

/// Trimmed field, or `None` if absent or not valid UTF-8
fn field(record: &ByteRecord, idx: usize) -> Option<&str> {
    record
        .get(idx)
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .map(str::trim)
}

fn parse_entry(record: &ByteRecord) -> Option<CacheEntry> {
    if record.len() < 5 {
        return None;
    }
    let latitude = field(record, 3)?.parse::<f64>().ok()?;
    let longitude = field(record, 4)?.parse::<f64>().ok()?;

    Some(CacheEntry::new(
        field(record, 0)?,
        field(record, 1)?,
        field(record, 2)?,
        Coordinate::new(latitude, longitude),
    ))
}
