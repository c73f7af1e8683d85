// VL01 Suntech - Translation core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Suntech packet encoder
//!
//! Builds the `;`-separated ASCII packets sent upstream. Every builder is
//! pure: values read from the device state store (cached output status,
//! protocol name) are passed in by the caller.
//!
//! # Field Layout
//!
//! ```text
//! STT/ALT: HDR;ID;FFF83F;218;1.0.12;RT;YYYYMMDD;HH:MM:SS;LAT;LON;SPD;CRS;
//!          SATT;FIX;IN_STATE;OUT_STATE;<trailer>;00028003;PWR;0.0;ODOM;1
//!   STT trailer: MODE;1;MSG_NUM;
//!   ALT trailer: ALERT_ID;ALERT_MOD;;
//! ALV:     ALV;ID
//! RES:     RES;ID;GRP;ACT;YYYY;MM;DD;HH:MM:SS;CELL;LAT;LON;SPD;CRS;SATT;FIX;
//!          ODOM;PWR;IN_STATE;OUT_STATE;MODE;0
//! MNT:     MNT;DEVICE_ID;SW_VER
//! ```

use crate::alarm::is_geofence_alert;
use crate::config::TranslatorConfig;
use crate::error::EncodeError;
use crate::protocol::LocationRecord;
use std::fmt;

/// Report map placeholder
pub const REPORT_MAP: &str = "FFF83F";
/// Device model placeholder
pub const MODEL: &str = "218";
/// Firmware version placeholder
pub const FIRMWARE: &str = "1.0.12";
/// Assign map announcing the telemetry block
pub const ASSIGN_MAP: &str = "00028003";
/// Power voltage when none is known
pub const DEFAULT_VOLTAGE: &str = "12.43";
/// Backup battery voltage
pub const BACKUP_VOLTAGE: &str = "0.0";
/// Hour meter flag
pub const HOUR_METER: &str = "1";
/// STT report type
pub const STT_REPORT_TYPE: &str = "1";
/// Satellites reported when none are known (STT/ALT)
pub const DEFAULT_SATELLITES: u8 = 15;
/// Maximum device id digits kept
pub const DEVICE_ID_DIGITS: usize = 10;
/// Message numbers wrap at this value
pub const MESSAGE_NUMBER_MODULUS: u32 = 10_000;

/// Suntech packet kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Location report
    Status,
    /// Alert report
    Alert,
    /// Keep-alive
    Alive,
    /// Command response
    Response,
    /// Presence announcement
    Maintenance,
}

impl PacketKind {
    /// Header tag
    pub fn header(&self) -> &'static str {
        match self {
            PacketKind::Status => "STT",
            PacketKind::Alert => "ALT",
            PacketKind::Alive => "ALV",
            PacketKind::Response => "RES",
            PacketKind::Maintenance => "MNT",
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Encoded Suntech packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuntechPacket {
    kind: PacketKind,
    fields: Vec<String>,
}

impl SuntechPacket {
    fn new(kind: PacketKind, fields: Vec<String>) -> Self {
        Self { kind, fields }
    }

    /// Packet kind
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    /// All fields, header included
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Field at `index` (0 = header)
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Wire text
    pub fn to_text(&self) -> String {
        self.fields.join(";")
    }

    /// Wire bytes, 7-bit ASCII only
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        let text = self.to_text();
        if !text.is_ascii() {
            return Err(EncodeError::NonAscii {
                kind: self.kind.header(),
                text,
            });
        }
        Ok(text.into_bytes())
    }
}

impl fmt::Display for SuntechPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Relay commands echoed back by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    /// `RELAY 1`: output on
    Engage,
    /// `RELAY 0`: output off
    Release,
}

impl RelayCommand {
    /// Parse the device's command echo (exact match)
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "RELAY 1" => Some(RelayCommand::Engage),
            "RELAY 0" => Some(RelayCommand::Release),
            _ => None,
        }
    }

    /// Suntech command group
    pub fn group(&self) -> &'static str {
        "04"
    }

    /// Suntech command action
    pub fn action(&self) -> &'static str {
        match self {
            RelayCommand::Engage => "01",
            RelayCommand::Release => "02",
        }
    }
}

/// Alert carried by an ALT packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    /// Suntech alert id
    pub id: u16,
    /// Geofence id, only emitted for geofence alerts
    pub geofence_id: Option<u32>,
}

impl Alert {
    /// Alert without a geofence id
    pub fn new(id: u16) -> Self {
        Self {
            id,
            geofence_id: None,
        }
    }
}

/// Keep the digits of a device id, at most the last 10
pub fn normalize_device_id(device_id: &str) -> String {
    let digits: Vec<char> = device_id.chars().filter(|c| c.is_ascii_digit()).collect();
    let start = digits.len().saturating_sub(DEVICE_ID_DIGITS);
    digits[start..].iter().collect()
}

/// Builder for Suntech packets
#[derive(Debug, Clone)]
pub struct SuntechEncoder {
    presence_label: String,
    translator_tag: String,
}

impl SuntechEncoder {
    /// Create an encoder with default configuration
    pub fn new() -> Self {
        Self::with_config(&TranslatorConfig::default())
    }

    /// Create an encoder from a translator configuration
    pub fn with_config(config: &TranslatorConfig) -> Self {
        Self {
            presence_label: config.presence_label.clone(),
            translator_tag: config.translator_tag.clone(),
        }
    }

    /// Location report (STT)
    pub fn location_report(
        &self,
        device_id: &str,
        record: &LocationRecord,
        serial: u32,
        is_realtime: bool,
        output_status: Option<u8>,
    ) -> SuntechPacket {
        let mut fields = base_fields(
            PacketKind::Status,
            device_id,
            record,
            is_realtime,
            output_status,
        );
        fields.extend([
            mode_flag(output_status).to_string(),
            STT_REPORT_TYPE.to_string(),
            format!("{:04}", serial % MESSAGE_NUMBER_MODULUS),
            String::new(),
        ]);
        fields.extend(telemetry_fields(record));

        let packet = SuntechPacket::new(PacketKind::Status, fields);
        log::debug!("Built Suntech packet: {}", packet);
        packet
    }

    /// Alert report (ALT)
    pub fn alert_report(
        &self,
        device_id: &str,
        record: &LocationRecord,
        alert: Alert,
        is_realtime: bool,
        output_status: Option<u8>,
    ) -> SuntechPacket {
        let alert_mod = match alert.geofence_id {
            Some(fence) if is_geofence_alert(alert.id) => fence.to_string(),
            _ => String::new(),
        };

        let mut fields = base_fields(
            PacketKind::Alert,
            device_id,
            record,
            is_realtime,
            output_status,
        );
        fields.extend([alert.id.to_string(), alert_mod, String::new(), String::new()]);
        fields.extend(telemetry_fields(record));

        let packet = SuntechPacket::new(PacketKind::Alert, fields);
        log::debug!("Built Suntech packet: {}", packet);
        packet
    }

    /// Keep-alive (ALV)
    pub fn keep_alive(&self, device_id: &str) -> SuntechPacket {
        let packet = SuntechPacket::new(
            PacketKind::Alive,
            vec![
                PacketKind::Alive.header().to_string(),
                normalize_device_id(device_id),
            ],
        );
        log::debug!("Built Suntech ALV packet: {}", packet);
        packet
    }

    /// Command response (RES)
    pub fn command_response(
        &self,
        device_id: &str,
        command: RelayCommand,
        record: &LocationRecord,
        output_status: Option<u8>,
    ) -> SuntechPacket {
        let ts = record.timestamp;
        let fields = vec![
            PacketKind::Response.header().to_string(),
            normalize_device_id(device_id),
            command.group().to_string(),
            command.action().to_string(),
            ts.format("%Y").to_string(),
            ts.format("%m").to_string(),
            ts.format("%d").to_string(),
            ts.format("%H:%M:%S").to_string(),
            record
                .cell
                .map(|c| c.cell_id.to_string())
                .unwrap_or_else(|| "0".to_string()),
            format!("{:.6}", record.latitude),
            format!("{:.6}", record.longitude),
            format!("{:.2}", record.speed_kmh as f64),
            format!("{:.2}", record.direction as f64),
            record.satellites.unwrap_or(0).to_string(),
            flag(record.gps_fixed()).to_string(),
            record.gps_odometer.unwrap_or(0).to_string(),
            record
                .voltage
                .map(raw_voltage)
                .unwrap_or_else(|| BACKUP_VOLTAGE.to_string()),
            padded_bit(record.acc_on() as u8),
            padded_bit(output_status.unwrap_or(0)),
            mode_flag(output_status).to_string(),
            // ERR_CODE
            "0".to_string(),
        ];

        let packet = SuntechPacket::new(PacketKind::Response, fields);
        log::info!("Built Suntech RES packet: {}", packet);
        packet
    }

    /// Presence announcement (MNT)
    ///
    /// Carries the device id as received, not normalized.
    pub fn presence(&self, device_id: &str, protocol: Option<&str>) -> SuntechPacket {
        let mut sw_ver = match protocol.filter(|p| !p.is_empty()) {
            Some(name) => name.to_uppercase(),
            None => self.presence_label.clone(),
        };
        sw_ver.push_str(&self.translator_tag);

        let packet = SuntechPacket::new(
            PacketKind::Maintenance,
            vec![
                PacketKind::Maintenance.header().to_string(),
                device_id.to_string(),
                sw_ver,
            ],
        );
        log::info!("Built Suntech MNT packet: {}", packet);
        packet
    }
}

impl Default for SuntechEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fields shared by STT and ALT, header through OUT_STATE
fn base_fields(
    kind: PacketKind,
    device_id: &str,
    record: &LocationRecord,
    is_realtime: bool,
    output_status: Option<u8>,
) -> Vec<String> {
    vec![
        kind.header().to_string(),
        normalize_device_id(device_id),
        REPORT_MAP.to_string(),
        MODEL.to_string(),
        FIRMWARE.to_string(),
        flag(is_realtime).to_string(),
        record.timestamp.format("%Y%m%d").to_string(),
        record.timestamp.format("%H:%M:%S").to_string(),
        signed_coordinate(record.latitude),
        signed_coordinate(record.longitude),
        format!("{:.2}", record.speed_kmh as f64),
        format!("{:.2}", record.direction as f64),
        record.satellites.unwrap_or(DEFAULT_SATELLITES).to_string(),
        flag(record.gps_fixed()).to_string(),
        padded_bit(record.acc_on() as u8),
        padded_bit(output_status.unwrap_or(0)),
    ]
}

/// Assign-map telemetry block closing STT and ALT
fn telemetry_fields(record: &LocationRecord) -> [String; 5] {
    [
        ASSIGN_MAP.to_string(),
        record
            .voltage
            .map(raw_voltage)
            .unwrap_or_else(|| DEFAULT_VOLTAGE.to_string()),
        BACKUP_VOLTAGE.to_string(),
        record.gps_odometer.unwrap_or(0).to_string(),
        HOUR_METER.to_string(),
    ]
}

/// Six decimals with an explicit sign, `+` for zero of either sign
fn signed_coordinate(degrees: f64) -> String {
    if degrees >= 0.0 {
        format!("+{:.6}", degrees.abs())
    } else {
        format!("{:.6}", degrees)
    }
}

/// Shortest round-trip text, keeping one decimal on whole values
fn raw_voltage(volts: f64) -> String {
    if volts.is_finite() && volts.fract() == 0.0 {
        format!("{:.1}", volts)
    } else {
        volts.to_string()
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// `"0"` once an output status has been cached, `"1"` before
fn mode_flag(output_status: Option<u8>) -> &'static str {
    if output_status.is_some() {
        "0"
    } else {
        "1"
    }
}

fn padded_bit(bit: u8) -> String {
    format!("0000000{}", bit)
}
