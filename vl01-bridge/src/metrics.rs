// VL01 Bridge - Prometheus metrics definitions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics for the translation pipeline.
//!
//! Counters are registered once in the default registry and updated by the
//! replay workers after every frame.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Encoder, Gauge,
    TextEncoder,
};
use vl01_suntech::{FrameType, Outcome};

lazy_static! {
    // ============================================================
    // Frame Metrics
    // ============================================================

    /// Frames handed to the translator, by frame type.
    pub static ref FRAMES_TOTAL: CounterVec = register_counter_vec!(
        "vl01_frames_total",
        "VL01 frames processed by type",
        &["frame_type"]
    ).unwrap();

    /// Frames that produced no upstream packet, by reason.
    pub static ref FRAMES_DROPPED_TOTAL: CounterVec = register_counter_vec!(
        "vl01_frames_dropped_total",
        "VL01 frames dropped without an upstream packet",
        &["reason"]
    ).unwrap();

    // ============================================================
    // Upstream Metrics
    // ============================================================

    /// Suntech packets sent upstream, by packet kind.
    pub static ref PACKETS_SENT_TOTAL: CounterVec = register_counter_vec!(
        "vl01_packets_sent_total",
        "Suntech packets sent upstream by kind",
        &["kind"]
    ).unwrap();

    /// Store or sender failures.
    pub static ref COLLABORATOR_ERRORS_TOTAL: Counter = register_counter!(
        "vl01_collaborator_errors_total",
        "State store, sender or encoding failures"
    ).unwrap();

    // ============================================================
    // Replay Metrics
    // ============================================================

    /// Devices in the replayed dataset.
    pub static ref REPLAY_DEVICES: Gauge = register_gauge!(
        "vl01_replay_devices",
        "Devices in the replayed dataset"
    ).unwrap();
}

/// Record the result of one translated frame.
pub fn record_outcome(frame_type: FrameType, outcome: &Outcome) {
    FRAMES_TOTAL.with_label_values(&[frame_type.as_str()]).inc();
    match outcome {
        Outcome::Sent(packet) => PACKETS_SENT_TOTAL
            .with_label_values(&[packet.kind().header()])
            .inc(),
        Outcome::Dropped(reason) => FRAMES_DROPPED_TOTAL
            .with_label_values(&[reason.label()])
            .inc(),
    }
}

/// Record a frame whose handling failed.
pub fn record_failure(frame_type: FrameType) {
    FRAMES_TOTAL.with_label_values(&[frame_type.as_str()]).inc();
    COLLABORATOR_ERRORS_TOTAL.inc();
}

/// Encode all metrics in Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
