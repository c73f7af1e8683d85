//! # VL01 Suntech - tracker protocol translation core
//!
//! Decodes binary frames from VL01 GPS trackers and re-encodes them as
//! Suntech ASCII reports, so VL01 devices can report into a Suntech backend.
//!
//! ## Key Features
//!
//! - **Bit-level decoding**: timestamp, fix, hemisphere bits, cell and
//!   odometer fields of VL01 location bodies
//! - **Alarm correlation**: alarm frames carry a short fix that is merged
//!   onto the device's last cached location
//! - **Suntech encoding**: STT, ALT, ALV, RES and MNT packets
//! - **Injected collaborators**: device state store and upstream sender
//!   are traits, with in-memory implementations
//!
//! ## Quick Start
//!
//! ```rust
//! use vl01_suntech::{FrameType, InboundFrame, MemorySender, MemoryStore, Translator};
//!
//! let translator = Translator::new(MemoryStore::new(), MemorySender::new());
//!
//! // 2024-06-01 12:00:00, 8 satellites, 45.0 N / 22.5 E, 60 km/h, fix valid
//! let mut body = vec![24, 6, 1, 12, 0, 0, 0x08];
//! body.extend_from_slice(&81_000_000u32.to_be_bytes());
//! body.extend_from_slice(&40_500_000u32.to_be_bytes());
//! body.push(60);
//! body.extend_from_slice(&0x145Au16.to_be_bytes());
//!
//! let frame = InboundFrame::new("868120301234567", 7, FrameType::Location, body);
//! let outcome = translator.handle(&frame).unwrap();
//!
//! let packet = outcome.packet().unwrap();
//! assert_eq!(packet.field(8), Some("+45.000000"));
//! assert_eq!(packet.field(9), Some("+22.500000"));
//! assert_eq!(translator.sender().pending(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: Frame types, location records and the alarm fix merge
//! - [`decoder`]: VL01 body decoding
//! - [`alarm`]: Alarm code table
//! - [`encoder`]: Suntech packet building
//! - [`store`]: Device state store trait and in-memory store
//! - [`sender`]: Upstream sender trait and in-memory sender
//! - [`translator`]: Per-frame handlers
//! - [`config`]: Translator configuration

// Modules
pub mod alarm;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod protocol;
pub mod sender;
pub mod store;
pub mod translator;

// Re-exports for convenient access
pub use alarm::{lookup as lookup_alarm, AlarmMapping, ALARM_TABLE};
pub use config::TranslatorConfig;
pub use decoder::{decode_fix, decode_location, CourseStatus};
pub use encoder::{
    normalize_device_id, Alert, PacketKind, RelayCommand, SuntechEncoder, SuntechPacket,
};
pub use error::{
    BridgeError, DecodeError, DropReason, EncodeError, Result, SendError, StoreError,
};
pub use protocol::{CellInfo, FrameType, GpsFix, InboundFrame, LocationRecord};
pub use sender::{MemorySender, SenderMetrics, SentPacket, Sender};
pub use store::{DeviceState, DeviceStateStore, MemoryStore};
pub use translator::{Outcome, Translator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
