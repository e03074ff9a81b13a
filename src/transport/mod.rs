//! Transport layer for the host serial link

use crate::error::Result;
use std::sync::{Arc, Mutex};

mod mock;
mod serial;

pub use mock::MockTransport;
pub use serial::SerialTransport;

/// Transport trait for host communication
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read. A read with no
    /// data available returns `Ok(0)` rather than blocking.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write data from buffer, returns number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any pending writes
    fn flush(&mut self) -> Result<()>;

    /// Write the entire buffer
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < data.len() {
            written += self.write(&data[written..])?;
        }
        Ok(())
    }
}

/// Transport shared between the command reader and telemetry writers.
///
/// The scheduler loop reads, module reports write; both sides hold the lock
/// only for the duration of one read or one line.
pub type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

/// Wrap a transport for shared use
pub fn shared(transport: Box<dyn Transport>) -> SharedTransport {
    Arc::new(Mutex::new(transport))
}
