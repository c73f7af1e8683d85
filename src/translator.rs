// VL01 Suntech - Translation core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Per-frame translation
//!
//! The [`Translator`] dispatches each inbound VL01 frame to the handler for
//! its type. A handler decodes the body, reads and updates the device state
//! store, builds at most one Suntech packet and hands it to the sender.
//!
//! # Example
//!
//! ```rust
//! use vl01_suntech::{FrameType, InboundFrame, MemorySender, MemoryStore, Translator};
//!
//! let translator = Translator::new(MemoryStore::new(), MemorySender::new());
//!
//! let heartbeat = InboundFrame::new("868120301234567", 1, FrameType::Heartbeat, vec![0x80]);
//! let outcome = translator.handle(&heartbeat).unwrap();
//!
//! assert!(outcome.is_sent());
//! assert_eq!(translator.sender().pop_sent().unwrap().text(), "ALV;0301234567");
//! ```
//!
//! Frames of one device must be handled in arrival order: every handler
//! reads and may overwrite that device's cached state. Frames of different
//! devices are independent.

use crate::alarm::{self, ALARM_CODE_AT, MIN_ALARM_BODY_LEN};
use crate::config::TranslatorConfig;
use crate::decoder::{age_seconds, decode_fix, decode_location, to_hex, FIX_LEN};
use crate::encoder::{normalize_device_id, Alert, RelayCommand, SuntechEncoder, SuntechPacket};
use crate::error::{DropReason, Result};
use crate::protocol::{FrameType, InboundFrame};
use crate::sender::Sender;
use crate::store::DeviceStateStore;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

/// Offset of the command echo in a command-reply body
pub const COMMAND_TEXT_AT: usize = 5;

/// Bytes following the command echo in a command-reply body
pub const COMMAND_TRAILER_LEN: usize = 4;

/// Result of handling one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A packet was handed to the sender
    Sent(SuntechPacket),
    /// Nothing was sent
    Dropped(DropReason),
}

impl Outcome {
    /// Whether a packet was sent
    pub fn is_sent(&self) -> bool {
        matches!(self, Outcome::Sent(_))
    }

    /// The sent packet, if any
    pub fn packet(&self) -> Option<&SuntechPacket> {
        match self {
            Outcome::Sent(packet) => Some(packet),
            Outcome::Dropped(_) => None,
        }
    }

    /// Why the frame was dropped, if it was
    pub fn drop_reason(&self) -> Option<&DropReason> {
        match self {
            Outcome::Sent(_) => None,
            Outcome::Dropped(reason) => Some(reason),
        }
    }
}

/// VL01 to Suntech translator
pub struct Translator<S, T> {
    store: S,
    sender: T,
    encoder: SuntechEncoder,
    config: TranslatorConfig,
}

impl<S: DeviceStateStore, T: Sender> Translator<S, T> {
    /// Create a translator with default configuration
    pub fn new(store: S, sender: T) -> Self {
        Self::with_config(store, sender, TranslatorConfig::default())
    }

    /// Create a translator with custom configuration
    pub fn with_config(store: S, sender: T, config: TranslatorConfig) -> Self {
        Self {
            store,
            sender,
            encoder: SuntechEncoder::with_config(&config),
            config,
        }
    }

    /// Device state store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Upstream sender
    pub fn sender(&self) -> &T {
        &self.sender
    }

    /// Translator configuration
    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Handle one frame, judging alarm staleness against the current time
    ///
    /// # Errors
    ///
    /// Returns an error only when the state store or the sender fails, or
    /// when a packet cannot be encoded as ASCII. Malformed or unsupported
    /// frames are reported as [`Outcome::Dropped`].
    pub fn handle(&self, frame: &InboundFrame) -> Result<Outcome> {
        self.handle_at(frame, Utc::now())
    }

    /// Handle one frame with an explicit current time
    pub fn handle_at(&self, frame: &InboundFrame, now: DateTime<Utc>) -> Result<Outcome> {
        let key = normalize_device_id(&frame.device_id);

        let outcome = match frame.frame_type {
            FrameType::Location => self.handle_location(&key, frame)?,
            FrameType::Alarm => self.handle_alarm(&key, frame, now)?,
            FrameType::Heartbeat => self.handle_heartbeat(&key, frame)?,
            FrameType::CommandReply => self.handle_command_reply(&key, frame, now)?,
            FrameType::Login => self.handle_login(&key, frame)?,
        };

        if let Outcome::Dropped(reason) = &outcome {
            debug!(
                "Dropped {} frame device_id={} serial={}: {}",
                frame.frame_type, frame.device_id, frame.serial, reason
            );
        }
        Ok(outcome)
    }

    fn handle_location(&self, key: &str, frame: &InboundFrame) -> Result<Outcome> {
        let record = match decode_location(&frame.body) {
            Ok(record) => record,
            Err(e) => {
                error!(
                    "Failed to decode VL01 location packet: {} body_hex={}",
                    e,
                    to_hex(&frame.body)
                );
                return Ok(Outcome::Dropped(e.into()));
            }
        };

        // Kept for alarms, which only carry a short fix
        self.store.save_last_location(key, &record)?;

        let output_status = self.store.last_output_status(key)?;
        let packet = self.encoder.location_report(
            &frame.device_id,
            &record,
            frame.serial,
            record.is_realtime.unwrap_or(true),
            output_status,
        );
        info!("Suntech location packet translated from VL01: {}", packet);
        self.dispatch(frame, packet)
    }

    fn handle_alarm(&self, key: &str, frame: &InboundFrame, now: DateTime<Utc>) -> Result<Outcome> {
        let body = &frame.body;
        if body.len() < MIN_ALARM_BODY_LEN {
            info!(
                "Alarm packet shorter than expected device_id={} body={}",
                frame.device_id,
                to_hex(body)
            );
            return Ok(Outcome::Dropped(DropReason::ShortFrame {
                needed: MIN_ALARM_BODY_LEN,
                available: body.len(),
            }));
        }

        let fix = match decode_fix(&body[..FIX_LEN]) {
            Ok(fix) => fix,
            Err(e) => {
                info!(
                    "Alarm packet without valid date/time, dropping device_id={}: {} body_hex={}",
                    frame.device_id,
                    e,
                    to_hex(body)
                );
                return Ok(Outcome::Dropped(e.into()));
            }
        };

        let threshold = now - self.config.staleness_window;
        if fix.timestamp <= threshold {
            info!(
                "Alarm replayed from device memory ({}s old) device_id={}",
                age_seconds(fix.timestamp, now),
                frame.device_id
            );
            if self.config.drop_stale_alarms {
                return Ok(Outcome::Dropped(DropReason::StaleAlarm));
            }
        }

        let code = body[ALARM_CODE_AT];
        let mapping = match alarm::lookup(code) {
            Some(mapping) => mapping,
            None => {
                warn!(
                    "Unmapped VL01 alarm received device_id={}, alarm_code=0x{:02X}",
                    frame.device_id, code
                );
                return Ok(Outcome::Dropped(DropReason::UnmappedAlarmCode(code)));
            }
        };

        let state = self.store.device_state(key)?;
        if state.last_location.is_none() {
            debug!(
                "No cached location for device_id={}, alert built from alarm fix only",
                frame.device_id
            );
        }
        let record = fix.merge_onto(state.last_location.as_ref());

        info!(
            "VL01 alarm 0x{:02X} ({}) translated to Suntech alert {} device_id={}",
            code, mapping.name, mapping.alert_id, frame.device_id
        );
        let packet = self.encoder.alert_report(
            &frame.device_id,
            &record,
            Alert::new(mapping.alert_id),
            true,
            state.last_output_status,
        );
        info!("Suntech alert packet translated from VL01: {}", packet);
        self.dispatch(frame, packet)
    }

    fn handle_heartbeat(&self, key: &str, frame: &InboundFrame) -> Result<Outcome> {
        match frame.body.first() {
            Some(&terminal_info) => {
                let output_status = (terminal_info >> 7) & 0b1;
                self.store.save_output_status(key, output_status)?;
            }
            None => debug!(
                "Heartbeat without terminal info device_id={}",
                frame.device_id
            ),
        }

        let packet = self.encoder.keep_alive(&frame.device_id);
        info!("Suntech keep-alive packet translated from VL01: {}", packet);
        self.dispatch(frame, packet)
    }

    fn handle_command_reply(
        &self,
        key: &str,
        frame: &InboundFrame,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        let body = &frame.body;
        if body.len() < COMMAND_TEXT_AT + COMMAND_TRAILER_LEN {
            error!(
                "Failed to decode command REPLY device_id={} body_hex={}",
                frame.device_id,
                to_hex(body)
            );
            return Ok(Outcome::Dropped(DropReason::MalformedCommandText));
        }

        let text: String = body[COMMAND_TEXT_AT..body.len() - COMMAND_TRAILER_LEN]
            .iter()
            .filter(|b| b.is_ascii())
            .map(|&b| b as char)
            .collect();

        let command = match RelayCommand::parse(&text) {
            Some(command) => command,
            None => {
                info!(
                    "Command reply not translated device_id={} text={:?}",
                    frame.device_id, text
                );
                return Ok(Outcome::Dropped(DropReason::UnrecognizedCommand(text)));
            }
        };

        let state = self.store.device_state(key)?;
        let mut record = match state.last_location {
            Some(record) => record,
            None => {
                error!(
                    "Command reply without cached location device_id={}",
                    frame.device_id
                );
                return Ok(Outcome::Dropped(DropReason::MissingCachedState));
            }
        };
        record.timestamp = now;

        let packet = self.encoder.command_response(
            &frame.device_id,
            command,
            &record,
            state.last_output_status,
        );
        self.dispatch(frame, packet)
    }

    fn handle_login(&self, key: &str, frame: &InboundFrame) -> Result<Outcome> {
        let protocol = self.store.protocol(key)?;
        let packet = self.encoder.presence(&frame.device_id, protocol.as_deref());
        self.dispatch(frame, packet)
    }

    fn dispatch(&self, frame: &InboundFrame, packet: SuntechPacket) -> Result<Outcome> {
        let bytes = packet.to_bytes()?;
        self.sender.send(&frame.device_id, frame.serial, &bytes)?;
        Ok(Outcome::Sent(packet))
    }
}
