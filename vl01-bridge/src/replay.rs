// VL01 Bridge - Frame replay engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Frame replay engine.
//!
//! Loads recorded VL01 frames from a CSV file and feeds them through the
//! translator. Frames are grouped per normalized device id; each device
//! gets its own blocking worker so its frames stay in arrival order while
//! devices run concurrently.
//!
//! # CSV Format
//!
//! ```text
//! device_id,serial,frame_type,body_hex
//! 868120301234567,1,location,180601...
//! ```

use crate::metrics::{record_failure, record_outcome, REPLAY_DEVICES};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use vl01_suntech::{
    normalize_device_id, DeviceStateStore, FrameType, InboundFrame, Outcome, Sender, Translator,
};

/// Configuration for frame replay.
#[derive(Debug, Clone, Default)]
pub struct ReplayConfig {
    /// Path to CSV frame file.
    pub csv_path: String,
}

/// State of the replay engine.
#[derive(Debug, Default)]
pub struct ReplayState {
    /// Frames handled so far.
    pub processed: AtomicUsize,
    /// Frames in the dataset.
    pub total_frames: AtomicUsize,
    /// Frames whose handling failed.
    pub failed: AtomicUsize,
    /// Whether replay is running.
    pub running: AtomicBool,
}

/// Summary of a loaded dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    /// Number of distinct devices.
    pub device_count: usize,
    /// Number of frames.
    pub frame_count: usize,
}

/// One CSV row.
#[derive(Debug, Deserialize)]
struct FrameRow {
    device_id: String,
    serial: u32,
    frame_type: FrameType,
    body_hex: String,
}

/// Frames of one device, in arrival order.
#[derive(Debug, Clone)]
pub struct DeviceQueue {
    /// Normalized device id.
    pub key: String,
    /// Frames to translate.
    pub frames: Vec<InboundFrame>,
}

/// Replay engine feeding recorded frames through a translator.
pub struct ReplayEngine {
    state: Arc<ReplayState>,
    queues: Vec<DeviceQueue>,
}

impl ReplayEngine {
    /// Create a new replay engine from a CSV file.
    pub fn from_csv(config: ReplayConfig) -> Result<Self, ReplayError> {
        let file = File::open(Path::new(&config.csv_path)).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ReplayError::FileNotFound(config.csv_path.clone()),
            _ => ReplayError::Io(e),
        })?;

        let frames = Self::parse_csv(file)?;
        if frames.is_empty() {
            return Err(ReplayError::EmptyDataset);
        }

        Ok(Self::from_frames(frames))
    }

    /// Create a replay engine from frames already in memory.
    pub fn from_frames(frames: Vec<InboundFrame>) -> Self {
        let state = ReplayState::default();
        state.total_frames.store(frames.len(), Ordering::SeqCst);

        Self {
            state: Arc::new(state),
            queues: group_by_device(frames),
        }
    }

    fn parse_csv<R: io::Read>(input: R) -> Result<Vec<InboundFrame>, ReplayError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);

        let mut frames = Vec::new();
        for (line, result) in reader.deserialize::<FrameRow>().enumerate() {
            let row = result?;
            let body = parse_hex(&row.body_hex).ok_or_else(|| {
                // Header is line 1
                ReplayError::InvalidFormat(format!("line {}: invalid body_hex", line + 2))
            })?;
            frames.push(InboundFrame::new(row.device_id, row.serial, row.frame_type, body));
        }

        Ok(frames)
    }

    /// Get the replay state.
    pub fn state(&self) -> Arc<ReplayState> {
        Arc::clone(&self.state)
    }

    /// Get dataset information.
    pub fn dataset_info(&self) -> DatasetInfo {
        DatasetInfo {
            device_count: self.queues.len(),
            frame_count: self.queues.iter().map(|q| q.frames.len()).sum(),
        }
    }

    /// Translate every frame, one blocking worker per device.
    pub async fn run<S, T>(self, translator: Arc<Translator<S, T>>)
    where
        S: DeviceStateStore + 'static,
        T: Sender + 'static,
    {
        self.state.running.store(true, Ordering::SeqCst);
        REPLAY_DEVICES.set(self.queues.len() as f64);
        info!("Replaying {} devices", self.queues.len());

        let mut workers = Vec::with_capacity(self.queues.len());
        for queue in self.queues {
            let translator = Arc::clone(&translator);
            let state = Arc::clone(&self.state);
            workers.push(tokio::task::spawn_blocking(move || {
                translate_queue(&translator, &state, queue)
            }));
        }

        for worker in workers {
            if let Err(e) = worker.await {
                error!("Replay worker panicked: {}", e);
            }
        }

        self.state.running.store(false, Ordering::SeqCst);
        info!(
            "Replay finished: {} frames, {} failures",
            self.state.processed.load(Ordering::SeqCst),
            self.state.failed.load(Ordering::SeqCst)
        );
    }
}

fn translate_queue<S: DeviceStateStore, T: Sender>(
    translator: &Translator<S, T>,
    state: &ReplayState,
    queue: DeviceQueue,
) {
    debug!(device = %queue.key, frames = queue.frames.len(), "worker started");

    for frame in &queue.frames {
        match translator.handle(frame) {
            Ok(outcome) => {
                if let Outcome::Dropped(reason) = &outcome {
                    debug!(device = %queue.key, serial = frame.serial, %reason, "frame dropped");
                }
                record_outcome(frame.frame_type, &outcome);
            }
            Err(e) => {
                warn!(
                    device = %queue.key,
                    serial = frame.serial,
                    frame_type = %frame.frame_type,
                    "Frame handling failed: {}",
                    e
                );
                record_failure(frame.frame_type);
                state.failed.fetch_add(1, Ordering::SeqCst);
            }
        }
        state.processed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Group frames by normalized device id, keeping arrival order.
pub fn group_by_device(frames: Vec<InboundFrame>) -> Vec<DeviceQueue> {
    let mut queues: Vec<DeviceQueue> = Vec::new();
    for frame in frames {
        let key = normalize_device_id(&frame.device_id);
        match queues.iter_mut().find(|q| q.key == key) {
            Some(queue) => queue.frames.push(frame),
            None => queues.push(DeviceQueue {
                key,
                frames: vec![frame],
            }),
        }
    }
    queues
}

/// Parse a hex string, ignoring whitespace.
pub fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return None;
    }

    digits
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        })
        .collect()
}

/// Replay errors.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
