//! Serial port transport

use super::Transport;
use crate::error::{Error, Result};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;

/// Read timeout for the host link. Kept short so the scheduler loop never
/// stalls waiting for host bytes.
const READ_TIMEOUT_MS: u64 = 5;

/// Serial port transport for the host link
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open a serial port at the given baud rate
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(path, baud)
            .timeout(Duration::from_millis(READ_TIMEOUT_MS))
            .open()
            .map_err(Error::Serial)?;
        log::info!("Opened host link {} at {} baud", path, baud);
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.port.write(data)?)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.port.flush()?)
    }
}
