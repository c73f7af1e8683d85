// VL01 Suntech - Translation core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! VL01 alarm code to Suntech alert id table

/// Offset of the alarm code in an alarm body
pub const ALARM_CODE_AT: usize = 17;

/// Minimum alarm body length
pub const MIN_ALARM_BODY_LEN: usize = 21;

/// Suntech alert id for an entering-geofence event
pub const ALERT_GEOFENCE_ENTER: u16 = 6;

/// Suntech alert id for an exiting-geofence event
pub const ALERT_GEOFENCE_EXIT: u16 = 5;

/// One VL01 alarm code and its Suntech counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmMapping {
    /// VL01 alarm code
    pub code: u8,
    /// Suntech alert id
    pub alert_id: u16,
    /// Human-readable name
    pub name: &'static str,
}

/// Every mapped alarm code
#[rustfmt::skip]
pub const ALARM_TABLE: &[AlarmMapping] = &[
    AlarmMapping { code: 0x01, alert_id: 42, name: "panic" },
    AlarmMapping { code: 0x02, alert_id: 41, name: "backup battery disconnected" },
    AlarmMapping { code: 0x03, alert_id: 15, name: "shock" },
    AlarmMapping { code: 0x04, alert_id: ALERT_GEOFENCE_ENTER, name: "geofence enter" },
    AlarmMapping { code: 0x05, alert_id: ALERT_GEOFENCE_EXIT, name: "geofence exit" },
    AlarmMapping { code: 0x06, alert_id: 1, name: "overspeed" },
    AlarmMapping { code: 0x19, alert_id: 14, name: "battery low" },
    AlarmMapping { code: 0xF0, alert_id: 46, name: "harsh acceleration" },
    AlarmMapping { code: 0xF1, alert_id: 47, name: "harsh braking" },
    AlarmMapping { code: 0x13, alert_id: 147, name: "device recovered" },
    AlarmMapping { code: 0x14, alert_id: 73, name: "anti-theft" },
    AlarmMapping { code: 0xFE, alert_id: 33, name: "ignition on" },
    AlarmMapping { code: 0xFF, alert_id: 34, name: "ignition off" },
];

/// Look up the mapping for a VL01 alarm code
pub fn lookup(code: u8) -> Option<&'static AlarmMapping> {
    ALARM_TABLE.iter().find(|m| m.code == code)
}

/// Suntech alert id for a VL01 alarm code
pub fn suntech_alert_id(code: u8) -> Option<u16> {
    lookup(code).map(|m| m.alert_id)
}

/// Whether the alert id carries a geofence id in its modifier field
pub fn is_geofence_alert(alert_id: u16) -> bool {
    alert_id == ALERT_GEOFENCE_ENTER || alert_id == ALERT_GEOFENCE_EXIT
}
