//! Repository layer for SQLite persistence.
//!
//! One table, `literature_domains`, keyed by absolute file path. Every write is
//! a single-statement upsert, so an interrupted scan leaves the table
//! consistent and a rerun simply overwrites rows.

mod document;
mod export;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use rusqlite::Connection;
use thiserror::Error;

pub use document::DocumentRepository;
pub use export::ExportReport;

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Open a connection with a busy timeout so a concurrent reader (e.g. a
/// `litdomain filter` in another shell) does not fail a scan's write.
pub(crate) fn connect(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

/// Convert a `query_row` result into an `Option`, treating "no rows" as `None`.
pub(crate) fn to_option<T>(result: rusqlite::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
///
/// Rows written by older versions of the tool carry SQLite's
/// `datetime('now','localtime')` format, which is accepted as local time.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_rfc3339() {
        let dt = parse_datetime("2024-03-01T08:30:00+00:00");
        assert_eq!(dt.to_rfc3339(), "2024-03-01T08:30:00+00:00");
    }

    #[test]
    fn test_parse_datetime_legacy_local_format() {
        let dt = parse_datetime("2024-03-01 08:30:00");
        assert_ne!(dt, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_parse_datetime_garbage_is_epoch() {
        assert_eq!(parse_datetime("yesterday"), DateTime::UNIX_EPOCH);
    }
}
