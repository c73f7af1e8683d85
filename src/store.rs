// VL01 Suntech - Translation core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Device state store abstraction
//!
//! The store is a per-device hash of string fields, the shape of a
//! key-value cache such as Redis. The core only needs three fields and a
//! read-then-write pattern per frame; typed accessors for those fields are
//! provided on top of the raw field operations.

use crate::error::StoreError;
use crate::protocol::LocationRecord;
use std::collections::HashMap;
use std::sync::RwLock;

/// Cached JSON [`LocationRecord`]
pub const LAST_LOCATION_FIELD: &str = "last_location_data";

/// Cached output (relay) status, `0` or `1`
pub const LAST_OUTPUT_STATUS_FIELD: &str = "last_output_status";

/// Protocol name announced in MNT packets
pub const PROTOCOL_FIELD: &str = "protocol";

/// Typed view of what the core keeps per device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceState {
    /// Most recent decoded location
    pub last_location: Option<LocationRecord>,
    /// Last output status seen in a heartbeat
    pub last_output_status: Option<u8>,
}

/// Trait for device state stores
pub trait DeviceStateStore: Send + Sync {
    /// Read one field
    fn get_field(&self, device_id: &str, field: &str) -> Result<Option<String>, StoreError>;

    /// Read every field of a device, `None` when the device is unknown
    fn get_all(&self, device_id: &str) -> Result<Option<HashMap<String, String>>, StoreError>;

    /// Write one field
    fn set_field(&self, device_id: &str, field: &str, value: &str) -> Result<(), StoreError>;

    /// Last cached location
    fn last_location(&self, device_id: &str) -> Result<Option<LocationRecord>, StoreError> {
        match self.get_field(device_id, LAST_LOCATION_FIELD)? {
            Some(json) => LocationRecord::from_json(&json)
                .map(Some)
                .map_err(|e| StoreError::Corrupt {
                    device_id: device_id.to_string(),
                    field: LAST_LOCATION_FIELD,
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Replace the cached location
    fn save_last_location(
        &self,
        device_id: &str,
        record: &LocationRecord,
    ) -> Result<(), StoreError> {
        let json = record.to_json().map_err(|e| StoreError::Corrupt {
            device_id: device_id.to_string(),
            field: LAST_LOCATION_FIELD,
            reason: e.to_string(),
        })?;
        self.set_field(device_id, LAST_LOCATION_FIELD, &json)
    }

    /// Last cached output status
    fn last_output_status(&self, device_id: &str) -> Result<Option<u8>, StoreError> {
        match self.get_field(device_id, LAST_OUTPUT_STATUS_FIELD)? {
            Some(raw) => match raw.trim().parse::<u8>() {
                Ok(bit @ (0 | 1)) => Ok(Some(bit)),
                _ => Err(StoreError::Corrupt {
                    device_id: device_id.to_string(),
                    field: LAST_OUTPUT_STATUS_FIELD,
                    reason: format!("expected 0 or 1, got '{}'", raw),
                }),
            },
            None => Ok(None),
        }
    }

    /// Replace the cached output status
    fn save_output_status(&self, device_id: &str, status: u8) -> Result<(), StoreError> {
        self.set_field(device_id, LAST_OUTPUT_STATUS_FIELD, &(status & 1).to_string())
    }

    /// Protocol name recorded for the device
    fn protocol(&self, device_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .get_all(device_id)?
            .and_then(|mut fields| fields.remove(PROTOCOL_FIELD)))
    }

    /// Location and output status in one view
    fn device_state(&self, device_id: &str) -> Result<DeviceState, StoreError> {
        Ok(DeviceState {
            last_location: self.last_location(device_id)?,
            last_output_status: self.last_output_status(device_id)?,
        })
    }
}

impl<S: DeviceStateStore + ?Sized> DeviceStateStore for std::sync::Arc<S> {
    fn get_field(&self, device_id: &str, field: &str) -> Result<Option<String>, StoreError> {
        (**self).get_field(device_id, field)
    }

    fn get_all(&self, device_id: &str) -> Result<Option<HashMap<String, String>>, StoreError> {
        (**self).get_all(device_id)
    }

    fn set_field(&self, device_id: &str, field: &str, value: &str) -> Result<(), StoreError> {
        (**self).set_field(device_id, field, value)
    }
}

/// A simple in-memory store for tests and local runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    devices: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of devices with at least one field
    pub fn device_count(&self) -> usize {
        self.devices.read().map(|d| d.len()).unwrap_or(0)
    }

    /// Remove every field of a device
    pub fn forget(&self, device_id: &str) -> bool {
        self.devices
            .write()
            .map(|mut d| d.remove(device_id).is_some())
            .unwrap_or(false)
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

impl DeviceStateStore for MemoryStore {
    fn get_field(&self, device_id: &str, field: &str) -> Result<Option<String>, StoreError> {
        let devices = self.devices.read().map_err(poisoned)?;
        Ok(devices
            .get(device_id)
            .and_then(|fields| fields.get(field))
            .cloned())
    }

    fn get_all(&self, device_id: &str) -> Result<Option<HashMap<String, String>>, StoreError> {
        let devices = self.devices.read().map_err(poisoned)?;
        Ok(devices.get(device_id).cloned())
    }

    fn set_field(&self, device_id: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut devices = self.devices.write().map_err(poisoned)?;
        devices
            .entry(device_id.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }
}
