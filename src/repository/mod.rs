//! Repository layer for SQLite persistence.

mod stats;

pub use stats::StatsRepository;

use std::path::Path;

use rusqlite::Connection;

use crate::error::StoreError;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Open a connection with the pragmas every repository expects.
fn connect(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    Ok(conn)
}

/// Convert a no-rows query result into `None` instead of an error.
fn to_option<T>(result: rusqlite::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
