// VL01 Bridge - VL01 to Suntech translation host
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # VL01 Bridge
//!
//! Replays recorded VL01 frames through the Suntech translator, writes the
//! resulting packets to stdout and exposes Prometheus counters.
//!
//! ## Usage
//!
//! ```bash
//! # Translate a recorded session
//! vl01-bridge --csv frames.csv
//!
//! # Keep serving metrics on a custom port afterwards
//! vl01-bridge --csv frames.csv --serve --port 9090
//! ```

mod metrics;
mod replay;
mod sink;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use clap::Parser;
use metrics::encode_metrics;
use replay::{DatasetInfo, ReplayConfig, ReplayEngine, ReplayState};
use serde::Serialize;
use sink::LineSender;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;
use vl01_suntech::{MemoryStore, Translator, TranslatorConfig};

/// VL01 to Suntech bridge
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to serve metrics on
    #[arg(short, long, default_value = "9100")]
    port: u16,

    /// CSV file of frames to replay
    #[arg(short, long)]
    csv: Option<String>,

    /// Keep serving metrics after the replay finishes
    #[arg(long)]
    serve: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Drop alarms older than the staleness window instead of forwarding them
    #[arg(long)]
    drop_stale_alarms: bool,

    /// Alarm staleness window in seconds
    #[arg(long, default_value = "120")]
    staleness_secs: i64,
}

impl Args {
    fn translator_config(&self) -> TranslatorConfig {
        let mut config =
            TranslatorConfig::with_staleness_window(chrono::Duration::seconds(self.staleness_secs));
        config.drop_stale_alarms = self.drop_stale_alarms;
        config
    }
}

/// Application state shared across handlers.
struct AppState {
    replay_state: Option<Arc<ReplayState>>,
    dataset_info: Option<DatasetInfo>,
    start_time: std::time::Instant,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    // Packets go to stdout, logs to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("VL01 Bridge v{}", env!("CARGO_PKG_VERSION"));

    let translator = Arc::new(Translator::with_config(
        MemoryStore::new(),
        LineSender::stdout(),
        args.translator_config(),
    ));

    let (replay_state, dataset_info) = match args.csv.clone() {
        Some(csv_path) => match ReplayEngine::from_csv(ReplayConfig { csv_path }) {
            Ok(engine) => {
                let state = engine.state();
                let info = engine.dataset_info();
                info!(
                    "Dataset loaded: {} devices, {} frames",
                    info.device_count, info.frame_count
                );

                if args.serve {
                    let translator = Arc::clone(&translator);
                    tokio::spawn(async move {
                        engine.run(translator).await;
                    });
                } else {
                    engine.run(Arc::clone(&translator)).await;
                }

                (Some(state), Some(info))
            }
            Err(e) => {
                error!("Failed to load frames: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            info!("No frames specified, serving metrics only");
            (None, None)
        }
    };

    if !args.serve && args.csv.is_some() {
        return ExitCode::SUCCESS;
    }

    let state = Arc::new(AppState {
        replay_state,
        dataset_info,
        start_time: std::time::Instant::now(),
    });

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Metrics endpoint: http://{}/metrics", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler() -> impl IntoResponse {
    let metrics = encode_metrics();
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        metrics,
    )
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Status information response.
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    replay: Option<ReplayStatus>,
}

/// Replay status information.
#[derive(Serialize)]
struct ReplayStatus {
    running: bool,
    processed: usize,
    failed: usize,
    total_frames: usize,
    progress_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    dataset: Option<DatasetInfo>,
}

impl ReplayStatus {
    fn from_state(state: &ReplayState, dataset: Option<DatasetInfo>) -> Self {
        let processed = state.processed.load(Ordering::SeqCst);
        let total = state.total_frames.load(Ordering::SeqCst);
        let progress = if total > 0 {
            (processed as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        Self {
            running: state.running.load(Ordering::SeqCst),
            processed,
            failed: state.failed.load(Ordering::SeqCst),
            total_frames: total,
            progress_percent: progress,
            dataset,
        }
    }
}

/// Status handler - returns JSON status information.
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let replay = state
        .replay_state
        .as_ref()
        .map(|replay| ReplayStatus::from_state(replay, state.dataset_info.clone()));

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        replay,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_translator_config() {
        let args = Args::parse_from([
            "vl01-bridge",
            "--drop-stale-alarms",
            "--staleness-secs",
            "30",
        ]);
        let config = args.translator_config();
        assert!(config.drop_stale_alarms);
        assert_eq!(config.staleness_window, chrono::Duration::seconds(30));

        let args = Args::parse_from(["vl01-bridge"]);
        assert_eq!(args.port, 9100);
        assert!(!args.translator_config().drop_stale_alarms);
    }

    #[test]
    fn test_replay_status_json() {
        let state = ReplayState::default();
        state.total_frames.store(4, Ordering::SeqCst);
        state.processed.store(1, Ordering::SeqCst);

        let status = ReplayStatus::from_state(&state, None);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["progress_percent"], 25.0);
        assert_eq!(json["total_frames"], 4);
        assert!(json.get("dataset").is_none());
    }
}
