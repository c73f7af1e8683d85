// VL01 Bridge - Upstream line sink
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Line-oriented upstream sender.
//!
//! Suntech packets are written one per line, `\r\n` terminated.

use std::io::{self, Write};
use std::sync::Mutex;
use tracing::trace;
use vl01_suntech::{SendError, Sender};

/// Suntech line terminator.
pub const LINE_END: &[u8] = b"\r\n";

/// Sender writing each packet as a line to a writer.
pub struct LineSender<W> {
    writer: Mutex<W>,
}

impl LineSender<io::Stdout> {
    /// Sender writing to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> LineSender<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> Option<W> {
        self.writer.into_inner().ok()
    }
}

impl<W: Write + Send> Sender for LineSender<W> {
    fn send(&self, device_id: &str, serial: u32, packet: &[u8]) -> Result<(), SendError> {
        let mut writer = self.writer.lock().map_err(|_| SendError::Disconnected {
            reason: "writer lock poisoned".to_string(),
        })?;

        write_line(&mut *writer, packet).map_err(|e| SendError::Disconnected {
            reason: e.to_string(),
        })?;

        trace!(device_id, serial, bytes = packet.len(), "packet written");
        Ok(())
    }
}

fn write_line<W: Write>(writer: &mut W, packet: &[u8]) -> io::Result<()> {
    writer.write_all(packet)?;
    writer.write_all(LINE_END)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_crlf_terminated() {
        let sender = LineSender::new(Vec::new());
        sender.send("dev", 1, b"ALV;1").unwrap();
        sender.send("dev", 2, b"ALV;2").unwrap();

        let written = sender.into_inner().unwrap();
        assert_eq!(written, b"ALV;1\r\nALV;2\r\n".to_vec());
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_disconnect() {
        let sender = LineSender::new(BrokenPipe);
        assert!(matches!(
            sender.send("dev", 1, b"ALV;1"),
            Err(SendError::Disconnected { .. })
        ));
    }
}
