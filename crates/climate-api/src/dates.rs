//! Calendar handling for the query layer.
//!
//! Dates live in the `measurement` table as `YYYY-MM-DD` text and are
//! compared lexicographically by SQLite. This module owns the lookback
//! window anchor and the policy applied to date path parameters.

use chrono::NaiveDate;

/// Most recent observation date of the bundled dataset.
pub const REFERENCE_DATE: &str = "2017-08-23";

/// Length of the temperature lookback window.
pub const LOOKBACK_DAYS: i64 = 365;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A date path parameter that failed strict parsing.
#[derive(Debug, thiserror::Error)]
#[error("invalid date '{input}': expected YYYY-MM-DD")]
pub struct DateParamError {
    pub input: String,
}

/// How date path parameters are turned into query arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateMode {
    /// Pass the raw segment through; malformed dates just match fewer rows.
    #[default]
    Compat,
    /// Require a real calendar date and reject anything else.
    Strict,
}

impl DateMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            DateMode::Strict
        } else {
            DateMode::Compat
        }
    }

    /// Produce the string bound into the SQL comparison.
    pub fn normalize(self, raw: &str) -> Result<String, DateParamError> {
        match self {
            DateMode::Compat => Ok(raw.to_string()),
            DateMode::Strict => parse_date(raw).map(format_date),
        }
    }
}

/// Parse a `YYYY-MM-DD` date. Unpadded components are rejected.
pub fn parse_date(raw: &str) -> Result<NaiveDate, DateParamError> {
    let err = || DateParamError {
        input: raw.to_string(),
    };
    if raw.len() != 10 {
        return Err(err());
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| err())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Exclusive lower bound of the lookback window ending at `reference`.
pub fn lookback_cutoff(reference: NaiveDate) -> NaiveDate {
    reference - chrono::Duration::days(LOOKBACK_DAYS)
}
