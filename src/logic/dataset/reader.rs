//! CSV reader for the connection table
//!
//! Thin boundary glue: header-less rows are mapped positionally onto
//! `COLUMN_LAYOUT`; a header row, when present, must match it exactly.

use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use super::record::{ConnectionRecord, COLUMN_COUNT, COLUMN_LAYOUT};
use crate::logic::error::{IdsError, Result};

/// Read all records from a CSV file
pub fn read_csv(path: &Path, has_headers: bool) -> Result<Vec<ConnectionRecord>> {
    log::info!("Loading connection records from: {}", path.display());
    let file = std::fs::File::open(path)?;
    let records = read_from(file, has_headers)?;
    log::info!("Loaded {} records", records.len());
    Ok(records)
}

/// Read all records from any reader
pub fn read_from<R: Read>(reader: R, has_headers: bool) -> Result<Vec<ConnectionRecord>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(reader);

    if has_headers {
        let headers = csv_reader.headers()?;
        let names: Vec<&str> = headers.iter().map(|h| h.trim()).collect();
        if names.len() != COLUMN_COUNT || names.iter().zip(COLUMN_LAYOUT.iter()).any(|(a, b)| a != b) {
            return Err(IdsError::InvalidRecord {
                row: 0,
                reason: "header does not match the 43-column layout".to_string(),
            });
        }
    }

    let mut records = Vec::new();
    for (row, result) in csv_reader.records().enumerate() {
        let fields = result?;
        let values: Vec<&str> = fields.iter().collect();
        records.push(ConnectionRecord::from_fields(row, &values)?);
    }

    if records.is_empty() {
        return Err(IdsError::EmptyDataset("no rows in input".to_string()));
    }
    Ok(records)
}
