//! Test helpers for HTTP integration tests

#![allow(dead_code)]

use climate_api::dates::{format_date, lookback_cutoff, parse_date, DateMode, REFERENCE_DATE};
use climate_api::store::Measurement;
use climate_api::{create_router, AppState, MeasurementStore};
use rusqlite::{params, Connection};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

/// The three-row dataset used throughout the docs.
pub fn sample_rows() -> Vec<Measurement> {
    vec![
        Measurement::new("USC001", "2017-01-01", Some(0.0), 70.0),
        Measurement::new("USC001", "2017-01-02", None, 75.0),
        Measurement::new("USC002", "2017-01-01", Some(1.2), 68.0),
    ]
}

/// Create `hawaii.sqlite` under `dir` holding `rows`.
pub fn write_database(dir: &Path, rows: &[Measurement]) -> PathBuf {
    let path = dir.join("hawaii.sqlite");
    let conn = Connection::open(&path).expect("create database");
    conn.execute_batch(
        "CREATE TABLE measurement (
            id      INTEGER PRIMARY KEY,
            station TEXT,
            date    TEXT,
            prcp    FLOAT,
            tobs    FLOAT
        );",
    )
    .expect("create table");
    for m in rows {
        conn.execute(
            "INSERT INTO measurement (station, date, prcp, tobs) VALUES (?1, ?2, ?3, ?4)",
            params![m.station, m.date, m.prcp, m.tobs],
        )
        .expect("insert row");
    }
    path
}

/// Handle to a server running on an ephemeral local port
pub struct TestServer {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    shutdown_tx: watch::Sender<()>,
    _dir: tempfile::TempDir,
}

impl TestServer {
    pub async fn start(rows: &[Measurement]) -> Self {
        Self::start_with_mode(rows, DateMode::Compat).await
    }

    pub async fn start_with_mode(rows: &[Measurement], date_mode: DateMode) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_database(dir.path(), rows);
        let store = MeasurementStore::open(&path).expect("open store");

        let reference = parse_date(REFERENCE_DATE).expect("reference date");
        let state = AppState {
            store: Arc::new(store),
            date_mode,
            tobs_cutoff: format_date(lookback_cutoff(reference)),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, mut shutdown_rx) = watch::channel(());

        tokio::spawn(async move {
            axum::serve(listener, create_router(state))
                .with_graceful_shutdown(async move {
                    shutdown_rx.changed().await.ok();
                })
                .await
                .ok();
        });

        Self {
            addr,
            db_path: path,
            shutdown_tx,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        reqwest::get(self.url(path)).await.expect("request failed")
    }

    pub async fn get_json(&self, path: &str) -> serde_json::Value {
        let resp = self.get(path).await;
        assert_eq!(resp.status(), 200, "GET {}", path);
        resp.json().await.expect("json body")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown_tx.send(()).ok();
    }
}
