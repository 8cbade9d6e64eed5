//! Climate API
//!
//! Read-only HTTP JSON endpoints over a station weather-observation
//! database (`measurement(station, date, prcp, tobs)`).

pub mod config;
pub mod dates;
pub mod http_server;
pub mod store;

pub use config::{ConfigError, ServiceConfig};
pub use http_server::{create_router, run_http_server, AppState};
pub use store::{MeasurementStore, StoreError};
