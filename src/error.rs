// VL01 Suntech - Translation core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for the translation core
//!
//! Collaborator failures (state store, upstream sender) and encoding
//! failures are errors. Protocol-level rejections of a single frame are
//! not: they are reported as a [`DropReason`] inside
//! [`Outcome::Dropped`](crate::translator::Outcome::Dropped).

use thiserror::Error;

/// Result type alias for translation operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Main error type for translation operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Decoding error
    #[error("Decoding error: {0}")]
    Decode(#[from] DecodeError),

    /// Encoding error
    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    /// Device state store error
    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    /// Upstream sender error
    #[error("Sender error: {0}")]
    Send(#[from] SendError),
}

/// Errors while decoding a VL01 body
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer too short for the fixed layout
    #[error("Buffer too short: need at least {needed} bytes, got {available}")]
    BufferTooShort { needed: usize, available: usize },

    /// Date/time bytes do not form a valid calendar instant
    #[error(
        "Invalid timestamp: 20{year:02}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
    )]
    InvalidTimestamp {
        year: u8,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    },
}

/// Errors while encoding a Suntech packet
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Packet text is not 7-bit ASCII
    #[error("{kind} packet is not ASCII: {text}")]
    NonAscii { kind: &'static str, text: String },
}

/// Errors reported by a device state store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend unreachable or failed
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored field could not be interpreted
    #[error("Corrupt field '{field}' for device {device_id}: {reason}")]
    Corrupt {
        device_id: String,
        field: &'static str,
        reason: String,
    },
}

/// Errors reported by the upstream sender
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Upstream link is down
    #[error("Disconnected: {reason}")]
    Disconnected { reason: String },

    /// Send buffer full
    #[error("Send buffer full")]
    BufferFull,
}

/// Why a frame was dropped without sending anything upstream
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DropReason {
    /// Fixed-layout fields were malformed
    #[error("decode failure: {0}")]
    Decode(#[from] DecodeError),

    /// Alarm body shorter than the minimum
    #[error("short frame: need at least {needed} bytes, got {available}")]
    ShortFrame { needed: usize, available: usize },

    /// Alarm code has no Suntech counterpart
    #[error("unmapped alarm code 0x{0:02X}")]
    UnmappedAlarmCode(u8),

    /// Nothing cached and nothing usable in the frame
    #[error("no cached location for device")]
    MissingCachedState,

    /// Alarm replayed from device memory, dropped by configuration
    #[error("stale alarm replayed from device memory")]
    StaleAlarm,

    /// Command echo could not be extracted from the body
    #[error("malformed command text")]
    MalformedCommandText,

    /// Command echo is not one we answer
    #[error("unrecognized command '{0}'")]
    UnrecognizedCommand(String),
}

impl DropReason {
    /// Short stable label, used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            DropReason::Decode(_) => "decode_failure",
            DropReason::ShortFrame { .. } => "short_frame",
            DropReason::UnmappedAlarmCode(_) => "unmapped_alarm_code",
            DropReason::MissingCachedState => "missing_cached_state",
            DropReason::StaleAlarm => "stale_alarm",
            DropReason::MalformedCommandText => "malformed_command_text",
            DropReason::UnrecognizedCommand(_) => "unrecognized_command",
        }
    }
}
