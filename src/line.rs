//! Incremental line splitter for the inbound host byte stream
//!
//! The host protocol is newline-terminated ASCII. Bytes arrive in arbitrary
//! chunks from the serial port; this reader accumulates them and yields
//! complete lines, tolerating CRLF and bare LF endings.

use crate::transport::Transport;

/// Upper bound on an unterminated line before the buffer is dropped.
/// Anything longer than this is line noise, not a command.
const MAX_LINE_LEN: usize = 256;

/// Accumulates inbound bytes and splits them into command lines
#[derive(Default)]
pub struct LineReader {
    buffer: Vec<u8>,
}

impl LineReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read whatever is available from the transport and return any
    /// complete lines. Never blocks beyond the transport's own timeout.
    pub fn poll(&mut self, transport: &mut dyn Transport) -> Vec<String> {
        let mut chunk = [0u8; 256];
        loop {
            match transport.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    log::error!("Host read error: {}", e);
                    break;
                }
            }
        }
        self.drain_lines()
    }

    /// Feed bytes directly (used by tests)
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        self.drain_lines()
    }

    fn drain_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim_end_matches(['\n', '\r']);
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        // An unterminated over-long buffer is discarded rather than grown
        if self.buffer.len() > MAX_LINE_LEN {
            log::warn!("Discarding {} bytes of unterminated input", self.buffer.len());
            self.buffer.clear();
        }
        lines
    }
}
