// VL01 Suntech - Translation core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! VL01 location body decoder
//!
//! # Body Layout
//!
//! ```text
//! [yy mm dd hh mi ss: 6] [sats: 1] [lat: 4 BE] [lon: 4 BE] [speed: 1]
//! [course/status: 2 BE]
//! [mcc: 2 BE] [mnc: 1|2] [lac: 4 BE] [cell: 8 BE]
//! [acc: 1] [upload mode: 1] [realtime: 1] [mileage: 4 BE]
//! ```
//!
//! The first 16 bytes (up to and including speed) are the fix carried by
//! alarm frames. Full location frames add the course/status word and the
//! optional trailer. Trailer fields are decoded one by one and are simply
//! absent from the record when the body ends early.

use crate::error::DecodeError;
use crate::protocol::{CellInfo, GpsFix, LocationRecord, STATUS_ACC_ON, STATUS_GPS_FIXED};
use chrono::{NaiveDate, Utc};
use std::fmt::Write;

/// Length of the alarm fix layout
pub const FIX_LEN: usize = 16;

/// Length of the fixed part of a location body
pub const LOCATION_FIXED_LEN: usize = 18;

/// Raw coordinate units per degree
pub const COORDINATE_DIVISOR: f64 = 1_800_000.0;

const MCC_AT: usize = 18;
const MNC_AT: usize = 20;
/// LAC (4) followed by the cell id (8)
const LAC_LEN: usize = 4;
const CELL_LEN: usize = 8;

/// Decoded course/status word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseStatus {
    /// Course in degrees (bits 0-9)
    pub direction: u16,
    /// Latitude is north (bit 10)
    pub north: bool,
    /// Longitude is west (bit 11)
    pub west: bool,
    /// GPS fix valid (bit 12)
    pub gps_fixed: bool,
}

impl CourseStatus {
    /// Unpack the big-endian course/status word
    pub fn from_word(word: u16) -> Self {
        Self {
            direction: word & 0x03FF,
            north: (word >> 10) & 1 == 1,
            west: (word >> 11) & 1 == 1,
            gps_fixed: (word >> 12) & 1 == 1,
        }
    }

    /// Apply hemisphere bits to coordinate magnitudes
    pub fn sign(&self, latitude_abs: f64, longitude_abs: f64) -> (f64, f64) {
        let latitude = if self.north {
            latitude_abs.abs()
        } else {
            -latitude_abs.abs()
        };
        let longitude = if self.west {
            -longitude_abs.abs()
        } else {
            longitude_abs.abs()
        };
        (latitude, longitude)
    }
}

/// Optional fields following the fixed layout
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Trailer {
    cell: Option<CellInfo>,
    status_bits: Option<u8>,
    is_realtime: Option<bool>,
    gps_odometer: Option<u32>,
}

/// Decode the 16-byte fix shared by location and alarm bodies
pub fn decode_fix(body: &[u8]) -> Result<GpsFix, DecodeError> {
    if body.len() < FIX_LEN {
        return Err(DecodeError::BufferTooShort {
            needed: FIX_LEN,
            available: body.len(),
        });
    }

    let (year, month, day) = (body[0], body[1], body[2]);
    let (hour, minute, second) = (body[3], body[4], body[5]);
    let timestamp = NaiveDate::from_ymd_opt(2000 + year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .map(|naive| naive.and_utc())
        .ok_or(DecodeError::InvalidTimestamp {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })?;

    let satellites = body[6] & 0x0F;
    let lat_raw = u32::from_be_bytes([body[7], body[8], body[9], body[10]]);
    let lon_raw = u32::from_be_bytes([body[11], body[12], body[13], body[14]]);

    Ok(GpsFix {
        timestamp,
        satellites,
        latitude_abs: lat_raw as f64 / COORDINATE_DIVISOR,
        longitude_abs: lon_raw as f64 / COORDINATE_DIVISOR,
        speed_kmh: body[15],
    })
}

/// Decode a full location body
///
/// Fails only when the fixed 18-byte layout is truncated or its date is
/// invalid. Missing trailer bytes leave the matching fields unset.
pub fn decode_location(body: &[u8]) -> Result<LocationRecord, DecodeError> {
    if body.len() < LOCATION_FIXED_LEN {
        return Err(DecodeError::BufferTooShort {
            needed: LOCATION_FIXED_LEN,
            available: body.len(),
        });
    }

    let fix = decode_fix(body)?;
    let course = CourseStatus::from_word(u16::from_be_bytes([body[16], body[17]]));
    let (latitude, longitude) = course.sign(fix.latitude_abs, fix.longitude_abs);
    let trailer = decode_trailer(body, course.gps_fixed);

    Ok(LocationRecord {
        timestamp: fix.timestamp,
        satellites: Some(fix.satellites),
        latitude,
        longitude,
        speed_kmh: fix.speed_kmh,
        direction: course.direction,
        status_bits: trailer.status_bits,
        is_realtime: trailer.is_realtime,
        gps_odometer: trailer.gps_odometer,
        cell: trailer.cell,
        voltage: None,
    })
}

/// MNC width selected by bit 15 of the MCC word
pub fn mnc_length(mcc_word: u16) -> usize {
    if (mcc_word >> 15) & 1 == 1 {
        2
    } else {
        1
    }
}

/// Offset of the ACC byte for a given MNC width
pub fn acc_offset(mnc_len: usize) -> usize {
    MNC_AT + mnc_len + LAC_LEN + CELL_LEN
}

fn decode_trailer(body: &[u8], gps_fixed: bool) -> Trailer {
    let mcc_word = match read_u16(body, MCC_AT) {
        Some(word) => word,
        None => return Trailer::default(),
    };
    let mnc_len = mnc_length(mcc_word);
    let acc_at = acc_offset(mnc_len);

    let cell = decode_cell(body, mcc_word, mnc_len);

    let status_bits = body.get(acc_at).map(|&acc| {
        let mut bits = 0;
        if gps_fixed {
            bits |= STATUS_GPS_FIXED;
        }
        if acc == 1 {
            bits |= STATUS_ACC_ON;
        }
        bits
    });

    let is_realtime = body.get(acc_at + 2).map(|&flag| flag == 0x00);
    let gps_odometer = read_u32(body, acc_at + 3);

    Trailer {
        cell,
        status_bits,
        is_realtime,
        gps_odometer,
    }
}

fn decode_cell(body: &[u8], mcc_word: u16, mnc_len: usize) -> Option<CellInfo> {
    let mnc = match mnc_len {
        2 => read_u16(body, MNC_AT)?,
        _ => *body.get(MNC_AT)? as u16,
    };
    let lac_at = MNC_AT + mnc_len;
    let lac = read_u32(body, lac_at)?;
    let cell_bytes: [u8; CELL_LEN] = body
        .get(lac_at + LAC_LEN..lac_at + LAC_LEN + CELL_LEN)?
        .try_into()
        .ok()?;

    Some(CellInfo {
        mcc: mcc_word & 0x7FFF,
        mnc,
        lac,
        cell_id: u64::from_be_bytes(cell_bytes),
    })
}

fn read_u16(body: &[u8], at: usize) -> Option<u16> {
    let bytes: [u8; 2] = body.get(at..at + 2)?.try_into().ok()?;
    Some(u16::from_be_bytes(bytes))
}

fn read_u32(body: &[u8], at: usize) -> Option<u32> {
    let bytes: [u8; 4] = body.get(at..at + 4)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

/// Lowercase hex rendering of a body, for diagnostics
pub fn to_hex(body: &[u8]) -> String {
    let mut out = String::with_capacity(body.len() * 2);
    for byte in body {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Seconds elapsed since `timestamp`, negative for future timestamps
pub fn age_seconds(timestamp: chrono::DateTime<Utc>, now: chrono::DateTime<Utc>) -> i64 {
    (now - timestamp).num_seconds()
}
