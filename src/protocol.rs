// VL01 Suntech - Translation core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Protocol definitions
//!
//! This module defines the core types shared by the decoder, the encoder
//! and the packet handlers:
//! - Inbound frame types and the frame envelope delivered by the transport
//! - The decoded location snapshot ([`LocationRecord`])
//! - The short fix carried by alarm frames ([`GpsFix`]) and its merge rule

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bit 1 of `status_bits`: GPS fix valid
pub const STATUS_GPS_FIXED: u8 = 0b10;

/// Bit 0 of `status_bits`: ignition (ACC) on
pub const STATUS_ACC_ON: u8 = 0b01;

/// VL01 frame types, as tagged by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    /// Terminal login
    Login,
    /// GPS location report
    Location,
    /// Alarm event
    Alarm,
    /// Heartbeat / status
    Heartbeat,
    /// Reply to a server command
    CommandReply,
}

impl FrameType {
    /// Map a VL01 protocol number to a frame type
    pub fn from_protocol_number(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(FrameType::Login),
            0x22 | 0xA0 => Some(FrameType::Location),
            0x26 | 0xA4 => Some(FrameType::Alarm),
            0x13 => Some(FrameType::Heartbeat),
            0x21 => Some(FrameType::CommandReply),
            _ => None,
        }
    }

    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameType::Login => "login",
            FrameType::Location => "location",
            FrameType::Alarm => "alarm",
            FrameType::Heartbeat => "heartbeat",
            FrameType::CommandReply => "command_reply",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One frame as delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    /// Device identifier (IMEI, possibly decorated)
    pub device_id: String,
    /// Frame serial number
    pub serial: u32,
    /// Frame type
    pub frame_type: FrameType,
    /// Frame body, without transport framing
    pub body: Vec<u8>,
}

impl InboundFrame {
    /// Create a new inbound frame
    pub fn new(
        device_id: impl Into<String>,
        serial: u32,
        frame_type: FrameType,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            serial,
            frame_type,
            body: body.into(),
        }
    }
}

/// Serving cell reported in a full location frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellInfo {
    /// Mobile country code (bit 15 cleared)
    pub mcc: u16,
    /// Mobile network code
    pub mnc: u16,
    /// Location area code
    pub lac: u32,
    /// Cell identifier
    pub cell_id: u64,
}

/// One decoded snapshot of device telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Device-supplied UTC instant
    #[serde(with = "cache_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Satellites in use (0-15)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satellites: Option<u8>,
    /// Signed decimal degrees
    pub latitude: f64,
    /// Signed decimal degrees
    pub longitude: f64,
    /// Speed in km/h
    pub speed_kmh: u8,
    /// Course in degrees (10 bits)
    #[serde(default)]
    pub direction: u16,
    /// Bit 1 = GPS fix valid, bit 0 = ACC on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_bits: Option<u8>,
    /// `false` when the frame was replayed from device memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_realtime: Option<bool>,
    /// GPS odometer in kilometers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_odometer: Option<u32>,
    /// Serving cell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<CellInfo>,
    /// Supply voltage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
}

impl LocationRecord {
    /// Whether bit 1 of `status_bits` is set
    pub fn gps_fixed(&self) -> bool {
        self.status_bits.unwrap_or(0) & STATUS_GPS_FIXED != 0
    }

    /// Whether bit 0 of `status_bits` is set
    pub fn acc_on(&self) -> bool {
        self.status_bits.unwrap_or(0) & STATUS_ACC_ON != 0
    }

    /// Serialize to the cached JSON form
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse the cached JSON form
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Fix fields carried by the 16-byte alarm layout
///
/// Coordinates are magnitudes: the alarm layout has no hemisphere bits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsFix {
    pub timestamp: DateTime<Utc>,
    pub satellites: u8,
    pub latitude_abs: f64,
    pub longitude_abs: f64,
    pub speed_kmh: u8,
}

impl GpsFix {
    /// Overlay this fix on the last cached record
    ///
    /// Timestamp, satellites, speed and coordinate magnitudes come from
    /// the fix. Hemisphere signs and every other field come from `cached`.
    /// Without a cached record the coordinates are taken as non-negative.
    pub fn merge_onto(&self, cached: Option<&LocationRecord>) -> LocationRecord {
        match cached {
            Some(last) => LocationRecord {
                timestamp: self.timestamp,
                satellites: Some(self.satellites),
                latitude: self.latitude_abs.copysign(last.latitude),
                longitude: self.longitude_abs.copysign(last.longitude),
                speed_kmh: self.speed_kmh,
                ..last.clone()
            },
            None => LocationRecord {
                timestamp: self.timestamp,
                satellites: Some(self.satellites),
                latitude: self.latitude_abs,
                longitude: self.longitude_abs,
                speed_kmh: self.speed_kmh,
                direction: 0,
                status_bits: None,
                is_realtime: None,
                gps_odometer: None,
                cell: None,
                voltage: None,
            },
        }
    }
}

/// `YYYY-MM-DDTHH:MM:SS` timestamps for the device state cache
mod cache_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&text, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
