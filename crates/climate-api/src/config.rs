use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::dates::{self, DateMode};

/// Environment variable that overrides the configured database path.
pub const DATABASE_ENV: &str = "CLIMATE_API_DATABASE";

/// Service configuration, usually loaded from a YAML file.
///
/// Every field has a default so an empty file (or no file at all) yields a
/// working development setup.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// SQLite file holding the `measurement` table
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Host to bind to (default: "127.0.0.1")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 5000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Verbose logging (default: on in development builds)
    #[serde(default = "default_debug")]
    pub debug: bool,

    /// Reject date path parameters that are not `YYYY-MM-DD`
    #[serde(default)]
    pub strict_dates: bool,

    /// Anchor of the one-year temperature lookback
    #[serde(default = "default_reference_date")]
    pub reference_date: String,
}

fn default_database() -> PathBuf {
    PathBuf::from("Resources/hawaii.sqlite")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_debug() -> bool {
    cfg!(debug_assertions)
}

fn default_reference_date() -> String {
    dates::REFERENCE_DATE.to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            host: default_host(),
            port: default_port(),
            debug: default_debug(),
            strict_dates: false,
            reference_date: default_reference_date(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yaml reads an empty document as unit, not as an empty map
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load from an optional file, then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Ok(database) = std::env::var(DATABASE_ENV) {
            if !database.is_empty() {
                config.database = PathBuf::from(database);
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reference_date().map(|_| ())
    }

    pub fn reference_date(&self) -> Result<NaiveDate, ConfigError> {
        dates::parse_date(&self.reference_date)
            .map_err(|_| ConfigError::InvalidReferenceDate(self.reference_date.clone()))
    }

    pub fn date_mode(&self) -> DateMode {
        DateMode::from_strict(self.strict_dates)
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Invalid reference date '{0}': expected YYYY-MM-DD")]
    InvalidReferenceDate(String),
}
