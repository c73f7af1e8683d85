// VL01 Suntech - Translation core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Upstream sender abstraction
//!
//! This module provides the trait the translator hands finished packets to,
//! and an in-memory implementation for tests and local runs.

use crate::error::SendError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Statistics about sender usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderMetrics {
    /// Total packets sent
    pub packets_sent: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
}

/// Trait for upstream senders
pub trait Sender: Send + Sync {
    /// Deliver an encoded packet for a device
    fn send(&self, device_id: &str, serial: u32, packet: &[u8]) -> Result<(), SendError>;
}

impl<T: Sender + ?Sized> Sender for std::sync::Arc<T> {
    fn send(&self, device_id: &str, serial: u32, packet: &[u8]) -> Result<(), SendError> {
        (**self).send(device_id, serial, packet)
    }
}

/// A packet captured by [`MemorySender`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPacket {
    /// Device id as given to `send`
    pub device_id: String,
    /// Frame serial
    pub serial: u32,
    /// Packet bytes
    pub bytes: Vec<u8>,
}

impl SentPacket {
    /// Packet as text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

#[derive(Debug, Default)]
struct Outbox {
    packets: VecDeque<SentPacket>,
    metrics: SenderMetrics,
}

/// A simple in-memory sender for testing and local communication
#[derive(Debug)]
pub struct MemorySender {
    outbox: Mutex<Outbox>,
    /// Maximum buffered packets
    max_buffer_size: usize,
    /// Whether the sender is open
    is_open: AtomicBool,
}

impl MemorySender {
    /// Create a new memory sender
    pub fn new() -> Self {
        Self::with_buffer_size(1000)
    }

    /// Create with custom buffer size
    pub fn with_buffer_size(max_size: usize) -> Self {
        Self {
            outbox: Mutex::new(Outbox {
                packets: VecDeque::with_capacity(max_size.min(1024)),
                metrics: SenderMetrics::default(),
            }),
            max_buffer_size: max_size,
            is_open: AtomicBool::new(true),
        }
    }

    /// Pop the oldest sent packet
    pub fn pop_sent(&self) -> Option<SentPacket> {
        self.outbox.lock().ok()?.packets.pop_front()
    }

    /// Take every sent packet, oldest first
    pub fn drain(&self) -> Vec<SentPacket> {
        match self.outbox.lock() {
            Ok(mut outbox) => outbox.packets.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Number of buffered packets
    pub fn pending(&self) -> usize {
        self.outbox.lock().map(|o| o.packets.len()).unwrap_or(0)
    }

    /// Sender metrics
    pub fn metrics(&self) -> SenderMetrics {
        self.outbox
            .lock()
            .map(|o| o.metrics.clone())
            .unwrap_or_default()
    }

    /// Close the sender; further sends fail
    pub fn close(&self) {
        self.is_open.store(false, Ordering::SeqCst);
    }
}

impl Default for MemorySender {
    fn default() -> Self {
        Self::new()
    }
}

impl Sender for MemorySender {
    fn send(&self, device_id: &str, serial: u32, packet: &[u8]) -> Result<(), SendError> {
        if !self.is_open.load(Ordering::SeqCst) {
            return Err(SendError::Disconnected {
                reason: "Sender is closed".to_string(),
            });
        }

        let mut outbox = self.outbox.lock().map_err(|_| SendError::Disconnected {
            reason: "Sender lock poisoned".to_string(),
        })?;

        if outbox.packets.len() >= self.max_buffer_size {
            return Err(SendError::BufferFull);
        }

        outbox.packets.push_back(SentPacket {
            device_id: device_id.to_string(),
            serial,
            bytes: packet.to_vec(),
        });
        outbox.metrics.packets_sent += 1;
        outbox.metrics.bytes_sent += packet.len() as u64;

        Ok(())
    }
}
