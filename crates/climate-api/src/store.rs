//! SQLite measurement store — read-only access to the `measurement` table.
//!
//! The table is loaded by an external process. This module never writes to
//! it: every connection is opened with `SQLITE_OPEN_READ_ONLY`, and each
//! request gets its own short-lived [`MeasurementReader`].

use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// Name of the single table the service reads.
pub const MEASUREMENT_TABLE: &str = "measurement";

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("table '{0}' does not exist")]
    MissingTable(String),
    #[error("table '{table}' has no column '{column}'")]
    MissingColumn { table: String, column: String },
    #[error("query worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// One observation row of the `measurement` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub station: String,
    pub date: String,
    pub prcp: Option<f64>,
    pub tobs: f64,
}

impl Measurement {
    /// Columns the service relies on. Checked against the live table at startup.
    pub const COLUMNS: [&'static str; 4] = ["station", "date", "prcp", "tobs"];

    pub fn new(station: &str, date: &str, prcp: Option<f64>, tobs: f64) -> Self {
        Self {
            station: station.to_string(),
            date: date.to_string(),
            prcp,
            tobs,
        }
    }
}

/// A date/precipitation pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecipitationRow {
    pub date: String,
    pub prcp: Option<f64>,
}

/// A date/temperature pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureRow {
    pub date: String,
    pub tobs: f64,
}

/// Min/avg/max of `tobs`. All `None` when no row matched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TemperatureStats {
    pub min: Option<f64>,
    pub avg: Option<f64>,
    pub max: Option<f64>,
}

/// Handle to a validated measurement database.
///
/// Holds no connection itself; call [`MeasurementStore::reader`] to get one.
#[derive(Debug, Clone)]
pub struct MeasurementStore {
    path: PathBuf,
}

impl MeasurementStore {
    /// Open the database at `path` and check it exposes every column of
    /// [`Measurement`]. Fails if the file is missing or the schema is short.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }

        let store = Self {
            path: path.to_path_buf(),
        };
        let reader = store.reader()?;
        reader.validate_schema()?;

        log::info!(
            "[Store] opened {} ({} measurement rows)",
            path.display(),
            reader.row_count()?
        );
        Ok(store)
    }

    /// Open a fresh read-only connection.
    pub fn reader(&self) -> Result<MeasurementReader> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(MeasurementReader { conn })
    }
}

/// A single read-only connection to the measurement table.
pub struct MeasurementReader {
    conn: Connection,
}

impl MeasurementReader {
    /// Verify the `measurement` table exists and has the expected columns.
    pub fn validate_schema(&self) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1)")?;
        let columns = stmt
            .query_map(params![MEASUREMENT_TABLE], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(StoreError::MissingTable(MEASUREMENT_TABLE.to_string()));
        }
        for expected in Measurement::COLUMNS {
            if !columns.iter().any(|c| c.eq_ignore_ascii_case(expected)) {
                return Err(StoreError::MissingColumn {
                    table: MEASUREMENT_TABLE.to_string(),
                    column: expected.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn row_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM measurement", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Every row's date and precipitation, in storage order.
    pub fn all_precipitation(&self) -> Result<Vec<PrecipitationRow>> {
        let mut stmt = self.conn.prepare("SELECT date, prcp FROM measurement")?;
        let rows = stmt.query_map([], |row| {
            Ok(PrecipitationRow {
                date: row.get(0)?,
                prcp: row.get(1)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Each station identifier once, ordered by identifier.
    pub fn distinct_stations(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT station FROM measurement ORDER BY station")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Date/temperature pairs strictly after `cutoff`.
    pub fn temperature_observations_since(&self, cutoff: &str) -> Result<Vec<TemperatureRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT date, tobs FROM measurement WHERE date > ?1")?;
        let rows = stmt.query_map(params![cutoff], |row| {
            Ok(TemperatureRow {
                date: row.get(0)?,
                tobs: row.get(1)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Temperature stats over `date >= start`.
    pub fn temperature_stats_from(&self, start: &str) -> Result<TemperatureStats> {
        self.stats(
            "SELECT MIN(tobs), AVG(tobs), MAX(tobs) FROM measurement WHERE date >= ?1",
            params![start],
        )
    }

    /// Temperature stats over `start <= date <= end`.
    pub fn temperature_stats_range(&self, start: &str, end: &str) -> Result<TemperatureStats> {
        self.stats(
            "SELECT MIN(tobs), AVG(tobs), MAX(tobs) FROM measurement \
             WHERE date >= ?1 AND date <= ?2",
            params![start, end],
        )
    }

    fn stats(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<TemperatureStats> {
        let stats = self.conn.query_row(sql, args, |row| {
            Ok(TemperatureStats {
                min: row.get(0)?,
                avg: row.get(1)?,
                max: row.get(2)?,
            })
        })?;
        Ok(stats)
    }
}
