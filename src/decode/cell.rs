//! Single-producer/single-consumer frame handoff cell
//!
//! Models the interrupt-to-tick handoff explicitly: an atomic "frame ready"
//! flag plus a committed-frame buffer. The decode context is the only
//! writer, the scheduler tick the only reader; the types make that the only
//! workable usage rather than an ad hoc volatile-globals convention.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Latest-value cell between one decode context and one tick reader.
///
/// `publish` overwrites any unconsumed value - the tick always wants the
/// newest committed frame, not a backlog.
#[derive(Debug, Default)]
pub struct FrameCell<T> {
    ready: AtomicBool,
    slot: Mutex<Option<T>>,
}

impl<T> FrameCell<T> {
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            slot: Mutex::new(None),
        }
    }

    /// Producer side: commit a value. Called only from the decode context.
    pub fn publish(&self, value: T) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(value);
        self.ready.store(true, Ordering::Release);
    }

    /// Consumer side: take the latest committed value, if a new one has
    /// arrived since the last take. Called only from the scheduler tick.
    pub fn take(&self) -> Option<T> {
        if !self.ready.swap(false, Ordering::Acquire) {
            return None;
        }
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_is_one_shot() {
        let cell = FrameCell::new();
        assert_eq!(cell.take(), None::<u32>);

        cell.publish(7);
        assert_eq!(cell.take(), Some(7));
        assert_eq!(cell.take(), None);
    }

    #[test]
    fn test_publish_overwrites_unconsumed() {
        let cell = FrameCell::new();
        cell.publish(1);
        cell.publish(2);
        assert_eq!(cell.take(), Some(2));
    }
}
