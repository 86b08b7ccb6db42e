//! Reading the flat place list.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use tracing::{info, warn};

use crate::error::InputError;
use crate::models::PlaceRecord;

/// Default input file name
pub const DEFAULT_INPUT_PATH: &str = "country_city.csv";

/// Read place records from a CSV file.
///
/// The first row is a header and is ignored. Columns are city, country,
/// continent and notes; anything after the fourth column is ignored. Rows with
/// fewer than four fields are logged and skipped.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<PlaceRecord>, InputError> {
    let path = path.as_ref();
    info!("Reading places from {}", path.display());

    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::None)
        .from_path(path)
        .map_err(|source| InputError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(collect_records(reader))
}

/// Parse place records from any reader (header row included)
pub fn records_from_reader<R: Read>(rdr: R) -> Vec<PlaceRecord> {
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::None)
        .from_reader(rdr);
    collect_records(reader)
}

fn collect_records<R: Read>(mut reader: csv::Reader<R>) -> Vec<PlaceRecord> {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for result in reader.records() {
        match parse_row(result) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Skipping input row: {}", e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed input rows", skipped);
    }
    records
}

fn parse_row(result: csv::Result<csv::StringRecord>) -> Result<PlaceRecord, InputError> {
    let row = result.map_err(|source| InputError::Csv {
        line: source.position().map(|p| p.line()).unwrap_or(0),
        source,
    })?;
    let line = row.position().map(|p| p.line()).unwrap_or(0);

    if row.len() < 4 {
        return Err(InputError::MalformedRow {
            line,
            found: row.len(),
        });
    }

    Ok(PlaceRecord::new(&row[0], &row[1], &row[2], &row[3]).at_line(line))
}
