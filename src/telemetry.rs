//! Telemetry link shared by all modules
//!
//! Every outbound report is a single CRLF-terminated ASCII line starting
//! with the owning module's letter. The link wraps the shared transport;
//! rate limiting is each module's own responsibility (the next-report-at
//! pattern), the link only serializes access.

use crate::transport::SharedTransport;

/// Handle to the shared host line output. Cheap to clone; one per module.
#[derive(Clone)]
pub struct Telemetry {
    link: SharedTransport,
}

impl Telemetry {
    pub fn new(link: SharedTransport) -> Self {
        Self { link }
    }

    /// Send one line to the host, appending CRLF. Write failures are logged
    /// and swallowed - telemetry loss must never take down the tick path.
    pub fn send_line(&self, line: &str) {
        let Ok(mut transport) = self.link.lock() else {
            log::error!("Telemetry: transport mutex poisoned");
            return;
        };
        if let Err(e) = transport
            .write_all(line.as_bytes())
            .and_then(|_| transport.write_all(b"\r\n"))
        {
            log::warn!("Telemetry write failed: {}", e);
        }
    }
}
