//! Rangefinder module: decode thread plus telemetry reporter
//!
//! One instance per input pin. Setup spawns a decode thread - the software
//! stand-in for the edge interrupt - that drains the pin's edge queue into
//! the protocol decoder and publishes committed channel maps through a
//! [`FrameCell`]. The scheduler tick consumes the cell and reports at its
//! own rate, independent of the decode rate.
//!
//! Output lines: `<channel letter><raw byte as 2 hex digits>` per channel,
//! and a bare `X` when framing errors occurred since the last report.

use crate::core::Module;
use crate::decode::{
    ChannelMap, EdgeDecoder, EdgeEvent, FrameCell, FrameOutcome, Type1Decoder, Type2Decoder,
};
use crate::error::{Error, Result};
use crate::telemetry::Telemetry;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long the decode thread waits for an edge before rechecking the
/// shutdown flag
const IDLE_POLL_MS: u64 = 50;

/// State shared between the decode thread (writer) and the tick (reader)
#[derive(Default)]
struct DecodeShared {
    committed: FrameCell<ChannelMap>,
    framing_errors: AtomicU32,
    unknown_channels: AtomicU32,
    frames: AtomicU32,
}

/// Rangefinder decoder module
pub struct RangefinderModule {
    name: &'static str,
    /// Taken by the decode thread at setup
    decoder: Option<Box<dyn EdgeDecoder>>,
    events: Option<Receiver<EdgeEvent>>,
    shared: Arc<DecodeShared>,
    telemetry: Telemetry,
    report_interval_ms: u32,
    next_report_at: u64,
    /// Error count already surfaced to the host
    reported_errors: u32,
    /// Tick-side copy of the latest committed map
    map: ChannelMap,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl RangefinderModule {
    /// Module for a Type-1 (48-bit frame) controller
    pub fn type1(
        events: Receiver<EdgeEvent>,
        telemetry: Telemetry,
        report_interval_ms: u32,
    ) -> Self {
        Self::with_decoder("rangefinder1", Box::new(Type1Decoder::new()), events, telemetry, report_interval_ms)
    }

    /// Module for a Type-2 (16-bit frame) controller
    pub fn type2(
        events: Receiver<EdgeEvent>,
        telemetry: Telemetry,
        report_interval_ms: u32,
    ) -> Self {
        Self::with_decoder("rangefinder2", Box::new(Type2Decoder::new()), events, telemetry, report_interval_ms)
    }

    fn with_decoder(
        name: &'static str,
        decoder: Box<dyn EdgeDecoder>,
        events: Receiver<EdgeEvent>,
        telemetry: Telemetry,
        report_interval_ms: u32,
    ) -> Self {
        Self {
            name,
            decoder: Some(decoder),
            events: Some(events),
            shared: Arc::new(DecodeShared::default()),
            telemetry,
            report_interval_ms,
            next_report_at: 0,
            reported_errors: 0,
            map: ChannelMap::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Total committed frames (visible for tests and diagnostics)
    pub fn frames_decoded(&self) -> u32 {
        self.shared.frames.load(Ordering::Relaxed)
    }

    /// Total framing errors
    pub fn framing_errors(&self) -> u32 {
        self.shared.framing_errors.load(Ordering::Relaxed)
    }

    /// Frames that carried a channel id outside the known table
    pub fn unknown_channels(&self) -> u32 {
        self.shared.unknown_channels.load(Ordering::Relaxed)
    }
}

/// Decode loop: single writer of all decoder state
fn decode_loop(
    mut decoder: Box<dyn EdgeDecoder>,
    events: Receiver<EdgeEvent>,
    shared: Arc<DecodeShared>,
    shutdown: Arc<AtomicBool>,
) {
    let mut map = ChannelMap::new();
    while !shutdown.load(Ordering::Relaxed) {
        let event = match events.recv_timeout(Duration::from_millis(IDLE_POLL_MS)) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let Some(outcome) = decoder.on_edge(event) else {
            continue;
        };
        match outcome {
            FrameOutcome::Frame(readings) => {
                // Whole-frame commit: the tick never sees a partial update
                for (channel, reading) in readings {
                    map.set(channel, reading);
                }
                shared.frames.fetch_add(1, Ordering::Relaxed);
                shared.committed.publish(map.clone());
            }
            FrameOutcome::FramingError => {
                shared.framing_errors.fetch_add(1, Ordering::Relaxed);
            }
            FrameOutcome::UnknownChannel(id) => {
                shared.unknown_channels.fetch_add(1, Ordering::Relaxed);
                log::debug!("Unknown rangefinder channel id 0x{:02X}", id);
            }
        }
    }
    log::info!("Rangefinder decode thread exiting");
}

impl Module for RangefinderModule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn setup(&mut self) -> Result<()> {
        let decoder = self
            .decoder
            .take()
            .ok_or_else(|| Error::Other("rangefinder setup ran twice".into()))?;
        let events = self
            .events
            .take()
            .ok_or_else(|| Error::Other("rangefinder setup ran twice".into()))?;
        let shared = Arc::clone(&self.shared);
        let shutdown = Arc::clone(&self.shutdown);
        let handle = thread::Builder::new()
            .name(format!("{}-decode", self.name))
            .spawn(move || decode_loop(decoder, events, shared, shutdown))
            .map_err(|e| Error::Other(format!("Failed to spawn decode thread: {}", e)))?;
        self.worker = Some(handle);
        Ok(())
    }

    fn tick(&mut self, now_ms: u64) {
        if let Some(map) = self.shared.committed.take() {
            self.map = map;
        }
        if self.report_interval_ms == 0 || now_ms < self.next_report_at {
            return;
        }
        self.next_report_at = now_ms + self.report_interval_ms as u64;

        // Framing errors surface as their own line, rate-limited with the
        // rest of the telemetry, never fatal
        let errors = self.shared.framing_errors.load(Ordering::Relaxed);
        if errors != self.reported_errors {
            self.telemetry.send_line("X");
            self.reported_errors = errors;
        }

        for (channel, reading) in self.map.iter() {
            self.telemetry
                .send_line(&format!("{}{:02X}", channel.letter(), reading.raw));
        }
    }
}

impl Drop for RangefinderModule {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}
