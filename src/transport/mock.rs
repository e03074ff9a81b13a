//! Mock transport for testing

use super::Transport;
use crate::error::Result;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mock transport for unit testing
///
/// Clones share the same buffers, so a test can keep one handle while the
/// transport itself is owned by the scheduler.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    read_buffer: VecDeque<u8>,
    write_buffer: Vec<u8>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject data to be read
    pub fn inject_read(&self, data: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner.read_buffer.extend(data);
    }

    /// Inject a host command line (newline appended)
    pub fn inject_line(&self, line: &str) {
        self.inject_read(line.as_bytes());
        self.inject_read(b"\n");
    }

    /// Get all written data
    pub fn get_written(&self) -> Vec<u8> {
        self.inner.lock().unwrap().write_buffer.clone()
    }

    /// Get all written data as lines (CRLF or LF terminated)
    pub fn written_lines(&self) -> Vec<String> {
        let bytes = self.get_written();
        String::from_utf8_lossy(&bytes)
            .split('\n')
            .map(|l| l.trim_end_matches('\r').to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// Clear written data
    pub fn clear_written(&self) {
        self.inner.lock().unwrap().write_buffer.clear();
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        let available = inner.read_buffer.len().min(buffer.len());
        for item in buffer.iter_mut().take(available) {
            *item = inner.read_buffer.pop_front().unwrap();
        }
        Ok(available)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        inner.write_buffer.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_roundtrip() {
        let mock = MockTransport::new();
        mock.inject_read(b"H0\n");

        let mut handle = mock.clone();
        let mut buf = [0u8; 8];
        let n = handle.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"H0\n");

        handle.write_all(b"R0FF\r\n").unwrap();
        assert_eq!(mock.get_written(), b"R0FF\r\n");
        assert_eq!(mock.written_lines(), vec!["R0FF"]);
    }
}
