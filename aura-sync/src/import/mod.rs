//! Import Reader
//!
//! Strict decode of the device-export CSV into listen records. The
//! import is all-or-nothing: a short row or an unparsable timestamp
//! fails the entire batch so a silent partial import can never happen.

use std::path::Path;

use aura_common::db::models::{CatalogEntry, OBSERVED_AT_FORMAT};
use aura_common::{Error, Result};
use chrono::NaiveDateTime;
use tracing::info;

/// Minimum fields per export row:
/// external id, title, artist, observed time, source URL, detail URL
const REQUIRED_FIELDS: usize = 6;

/// One parsed row of the device-export CSV
#[derive(Debug, Clone, PartialEq)]
pub struct ListenRecord {
    pub external_id: String,
    pub title: String,
    pub artist: String,
    pub observed_at: NaiveDateTime,
    pub source_url: String,
    pub detail_url: String,
}

impl ListenRecord {
    /// Promote a parsed record to a catalog entry (not yet synchronized)
    pub fn into_entry(self) -> CatalogEntry {
        CatalogEntry {
            external_id: self.external_id,
            title: self.title,
            artist: self.artist,
            observed_at: self.observed_at,
            source_url: self.source_url,
            detail_url: self.detail_url,
            added_to_playlist: false,
        }
    }
}

/// Read a device-export CSV file
///
/// The first row is a header and is skipped. Rows must carry at least
/// six fields with the observation time formatted as
/// `YYYY-MM-DD HH:MM:SS`.
pub fn read_history_csv(path: &Path) -> Result<Vec<ListenRecord>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::InvalidInput(format!("Cannot open {}: {}", path.display(), e)))?;

    let records = parse_rows(reader)?;
    info!(path = %path.display(), rows = records.len(), "Parsed export file");
    Ok(records)
}

fn parse_rows<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<ListenRecord>> {
    let mut records = Vec::new();

    for (index, row) in reader.records().enumerate() {
        // Header is row 1; data rows start at 2
        let line = index + 2;
        let row = row.map_err(|e| Error::InvalidInput(format!("Row {line}: {e}")))?;

        if row.len() < REQUIRED_FIELDS {
            return Err(Error::InvalidInput(format!(
                "Row {line}: expected at least {REQUIRED_FIELDS} fields, got {}",
                row.len()
            )));
        }

        let observed_at = NaiveDateTime::parse_from_str(&row[3], OBSERVED_AT_FORMAT)
            .map_err(|e| {
                Error::InvalidInput(format!("Row {line}: bad timestamp {:?}: {e}", &row[3]))
            })?;

        records.push(ListenRecord {
            external_id: row[0].to_string(),
            title: row[1].to_string(),
            artist: row[2].to_string(),
            observed_at,
            source_url: row[4].to_string(),
            detail_url: row[5].to_string(),
        });
    }

    Ok(records)
}
