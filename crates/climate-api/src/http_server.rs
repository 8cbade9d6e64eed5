//! HTTP JSON API over the measurement store.
//!
//! Each handler resolves its path parameters, opens a per-request
//! [`MeasurementReader`] on a blocking worker, runs exactly one query and
//! serializes the rows.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

use crate::dates::{DateMode, DateParamError};
use crate::store::{
    MeasurementReader, MeasurementStore, PrecipitationRow, StoreError, TemperatureRow,
    TemperatureStats,
};

const INDEX: &str = "Available Routes: <br/>\
/api/v1.0/precipitation<br/>\
/api/v1.0/stations<br/>\
/api/v1.0/tobs<br/>\
/api/v1.0/start/{start}<br/>\
/api/v1.0/start-end/{start}/{end}<br/>";

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MeasurementStore>,
    pub date_mode: DateMode,
    /// Exclusive lower bound of the `/tobs` window, already formatted
    pub tobs_cutoff: String,
}

/// JSON entry of the precipitation listing
#[derive(Debug, Serialize)]
pub struct PrecipitationResponse {
    pub date: String,
    pub prcp: Option<f64>,
}

/// JSON entry of the temperature listing
#[derive(Debug, Serialize)]
pub struct TemperatureResponse {
    pub date: String,
    pub tobs: f64,
}

/// JSON aggregate; absent values serialize as `null`
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(rename = "Min")]
    pub min: Option<f64>,
    #[serde(rename = "Avg")]
    pub avg: Option<f64>,
    #[serde(rename = "Max")]
    pub max: Option<f64>,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failures a handler can report.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    BadDate(#[from] DateParamError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadDate(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("[HTTP] {}", self);
        }
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<PrecipitationRow> for PrecipitationResponse {
    fn from(row: PrecipitationRow) -> Self {
        Self {
            date: row.date,
            prcp: row.prcp,
        }
    }
}

impl From<TemperatureRow> for TemperatureResponse {
    fn from(row: TemperatureRow) -> Self {
        Self {
            date: row.date,
            tobs: row.tobs,
        }
    }
}

impl From<TemperatureStats> for StatsResponse {
    fn from(stats: TemperatureStats) -> Self {
        Self {
            min: stats.min,
            avg: stats.avg,
            max: stats.max,
        }
    }
}

/// Run `query` against a fresh reader on the blocking pool.
async fn with_reader<T, F>(store: Arc<MeasurementStore>, query: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&MeasurementReader) -> crate::store::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let reader = store.reader()?;
        query(&reader)
    })
    .await
    .map_err(|e| StoreError::Worker(e.to_string()))?
}

/// GET / - List available routes
async fn index() -> Html<&'static str> {
    Html(INDEX)
}

/// GET /api/v1.0/precipitation - Every date/precipitation pair
async fn precipitation(
    State(state): State<AppState>,
) -> Result<Json<Vec<PrecipitationResponse>>, ApiError> {
    log::debug!("[HTTP] precipitation");
    let rows = with_reader(state.store, |r| r.all_precipitation()).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// GET /api/v1.0/stations - Distinct station identifiers
async fn stations(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    log::debug!("[HTTP] stations");
    let stations = with_reader(state.store, |r| r.distinct_stations()).await?;
    Ok(Json(stations))
}

/// GET /api/v1.0/tobs - Temperatures in the year before the reference date
async fn tobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<TemperatureResponse>>, ApiError> {
    log::debug!("[HTTP] tobs after {}", state.tobs_cutoff);
    let cutoff = state.tobs_cutoff;
    let rows = with_reader(state.store, move |r| {
        r.temperature_observations_since(&cutoff)
    })
    .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// GET /api/v1.0/start/{start} - Stats for dates on or after `start`
async fn stats_from(
    State(state): State<AppState>,
    Path(start): Path<String>,
) -> Result<Json<StatsResponse>, ApiError> {
    let start = state.date_mode.normalize(&start)?;
    log::debug!("[HTTP] stats from {}", start);
    let stats = with_reader(state.store, move |r| r.temperature_stats_from(&start)).await?;
    Ok(Json(stats.into()))
}

/// GET /api/v1.0/start-end/{start}/{end} - Stats for dates in `[start, end]`
async fn stats_range(
    State(state): State<AppState>,
    Path((start, end)): Path<(String, String)>,
) -> Result<Json<StatsResponse>, ApiError> {
    let start = state.date_mode.normalize(&start)?;
    let end = state.date_mode.normalize(&end)?;
    log::debug!("[HTTP] stats from {} to {}", start, end);
    let stats = with_reader(state.store, move |r| {
        r.temperature_stats_range(&start, &end)
    })
    .await?;
    Ok(Json(stats.into()))
}

/// Create the HTTP router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/api/v1.0/precipitation", get(precipitation))
        .route("/api/v1.0/stations", get(stations))
        .route("/api/v1.0/tobs", get(tobs))
        .route("/api/v1.0/start/{start}", get(stats_from))
        .route("/api/v1.0/start-end/{start}/{end}", get(stats_range))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP server until `shutdown_rx` fires
pub async fn run_http_server(
    state: AppState,
    addr: &str,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("[HTTP] listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_rx.changed().await.ok();
        })
        .await?;

    log::info!("[HTTP] server stopped.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_precipitation_serializes_as_null() {
        let resp = PrecipitationResponse::from(PrecipitationRow {
            date: "2017-01-02".into(),
            prcp: None,
        });
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"date":"2017-01-02","prcp":null}"#);
    }

    #[test]
    fn test_stats_keys_are_capitalized() {
        let resp = StatsResponse::from(TemperatureStats {
            min: Some(68.0),
            avg: Some(71.0),
            max: Some(75.0),
        });
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"Min":68.0,"Avg":71.0,"Max":75.0}"#);
    }

    #[test]
    fn test_empty_stats_serialize_as_nulls() {
        let json = serde_json::to_string(&StatsResponse::from(TemperatureStats::default())).unwrap();
        assert_eq!(json, r#"{"Min":null,"Avg":null,"Max":null}"#);
    }

    #[test]
    fn test_error_status_codes() {
        let bad = ApiError::from(DateParamError {
            input: "2017-13-01".into(),
        });
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);
        assert!(bad.to_string().contains("2017-13-01"));

        let store = ApiError::from(StoreError::MissingTable("measurement".into()));
        assert_eq!(store.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_index_lists_every_route() {
        for route in [
            "/api/v1.0/precipitation",
            "/api/v1.0/stations",
            "/api/v1.0/tobs",
            "/api/v1.0/start/",
            "/api/v1.0/start-end/",
        ] {
            assert!(INDEX.contains(route), "missing {}", route);
        }
    }
}
