//! Edge events and the pin-to-decoder registration table
//!
//! A hardware backend (GPIO interrupt handler, kernel gpio-event poller, or
//! a test) produces [`EdgeEvent`]s and routes them through a [`PinTable`].
//! Each bound pin forwards into a bounded channel drained by exactly one
//! decode thread, so decoder state keeps a single writer.

use crate::error::{Error, Result};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::collections::HashMap;

/// Capacity of one pin's edge queue. The fastest protocol produces an edge
/// roughly every 100us; 1024 entries buffer ~100ms of worst-case backlog.
const EDGE_QUEUE_CAPACITY: usize = 1024;

/// Signal edge direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgePolarity {
    Rising,
    Falling,
}

/// One GPIO edge with its monotonic timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    /// Microseconds on the scheduler's monotonic clock
    pub at_us: u64,
    pub polarity: EdgePolarity,
}

impl EdgeEvent {
    pub fn rising(at_us: u64) -> Self {
        Self {
            at_us,
            polarity: EdgePolarity::Rising,
        }
    }

    pub fn falling(at_us: u64) -> Self {
        Self {
            at_us,
            polarity: EdgePolarity::Falling,
        }
    }
}

/// Create a bounded edge-event channel for one pin
pub fn edge_channel() -> (Sender<EdgeEvent>, Receiver<EdgeEvent>) {
    crossbeam_channel::bounded(EDGE_QUEUE_CAPACITY)
}

/// Registration table binding input pins to decoder instances.
///
/// One sender per pin; binding the same pin twice is an error, which is
/// what rules out the legacy two-decoders-on-shared-globals construction.
#[derive(Default)]
pub struct PinTable {
    bindings: HashMap<u8, Sender<EdgeEvent>>,
}

impl PinTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a pin to a decoder's edge queue
    pub fn bind(&mut self, pin: u8, sender: Sender<EdgeEvent>) -> Result<()> {
        if self.bindings.contains_key(&pin) {
            return Err(Error::PinInUse(pin));
        }
        self.bindings.insert(pin, sender);
        Ok(())
    }

    /// Route an edge to the decoder bound to `pin`. Unbound pins and full
    /// queues drop the event; a full queue means the decode thread is not
    /// keeping up and stale edges would only decode garbage.
    pub fn route(&self, pin: u8, event: EdgeEvent) {
        let Some(sender) = self.bindings.get(&pin) else {
            return;
        };
        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::warn!("Edge queue full on pin {}, dropping edge", pin);
            }
            Err(TrySendError::Disconnected(_)) => {
                log::debug!("Edge receiver for pin {} gone", pin);
            }
        }
    }

    pub fn is_bound(&self, pin: u8) -> bool {
        self.bindings.contains_key(&pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_route() {
        let mut table = PinTable::new();
        let (tx, rx) = edge_channel();
        table.bind(2, tx).unwrap();

        table.route(2, EdgeEvent::falling(100));
        table.route(3, EdgeEvent::rising(200)); // unbound, dropped

        assert_eq!(rx.try_recv().unwrap(), EdgeEvent::falling(100));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_double_bind_rejected() {
        let mut table = PinTable::new();
        let (tx1, _rx1) = edge_channel();
        let (tx2, _rx2) = edge_channel();
        table.bind(2, tx1).unwrap();
        assert!(matches!(table.bind(2, tx2), Err(Error::PinInUse(2))));
    }
}
