//! End-to-end scheduler tests: host lines in, module behavior and telemetry
//! lines out, over the mock transport.

use sarathi_io::config::HelmConfig;
use sarathi_io::core::types::{AttitudeState, Orientation, Rates};
use sarathi_io::core::ModuleRegistry;
use sarathi_io::decode::edge::edge_channel;
use sarathi_io::decode::EdgeEvent;
use sarathi_io::line::LineReader;
use sarathi_io::modules::{
    shared_drive, DriveModule, HelmModule, RangefinderModule, RecordingDrive,
};
use sarathi_io::telemetry::Telemetry;
use sarathi_io::transport::{self, MockTransport, Transport};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct Rig {
    registry: ModuleRegistry,
    reader: LineReader,
    host: MockTransport,
    shared: transport::SharedTransport,
    drive: RecordingDrive,
    attitude: Arc<AttitudeState>,
}

impl Rig {
    fn new() -> Self {
        let host = MockTransport::new();
        let shared = transport::shared(Box::new(host.clone()));
        let telemetry = Telemetry::new(Arc::clone(&shared));

        let attitude = Arc::new(AttitudeState::new());
        let drive = RecordingDrive::new();
        let drive_handle = shared_drive(Box::new(drive.clone()));

        let mut registry = ModuleRegistry::new();
        registry.register(Box::new(HelmModule::new(
            &HelmConfig::default(),
            Arc::clone(&attitude),
            Arc::clone(&drive_handle),
            telemetry.clone(),
        )));
        registry.register(Box::new(DriveModule::new(
            drive_handle,
            telemetry,
            0,
        )));
        registry.setup_all().unwrap();

        Rig {
            registry,
            reader: LineReader::new(),
            host,
            shared,
            drive,
            attitude,
        }
    }

    /// One scheduler iteration: drain host lines, dispatch, tick
    fn cycle(&mut self, now_ms: u64) {
        let lines = {
            let mut transport = self.shared.lock().unwrap();
            self.reader.poll(&mut **transport)
        };
        for line in lines {
            self.registry.dispatch_line(&line);
        }
        self.registry.tick_all(now_ms);
    }

    fn set_heading(&self, yaw: i32, yaw_rate: i32) {
        self.attitude.store(
            Orientation {
                roll: 0,
                pitch: 0,
                yaw,
            },
            Rates {
                roll_rate: 0,
                pitch_rate: 0,
                yaw_rate,
            },
        );
    }
}

#[test]
fn course_command_drives_motors_and_reports() {
    let mut rig = Rig::new();
    rig.set_heading(0, 0);

    rig.host.inject_line("HC090 050 1000");
    rig.cycle(100);

    // Helm commanded a clockwise turn within power limits
    let (left, right) = rig.drive.last_call().expect("drive commanded");
    assert_eq!((left, right), (45, -35));

    // Debug line went out on the host link
    let lines = rig.host.written_lines();
    assert!(lines.iter().any(|l| l.starts_with("HD ")), "lines: {:?}", lines);
}

#[test]
fn stop_command_zeroes_drive_despite_pending_course() {
    let mut rig = Rig::new();
    rig.set_heading(270, 10);

    rig.host.inject_line("HC090 050");
    rig.cycle(100);
    assert_ne!(rig.drive.last_call(), Some((0, 0)));

    rig.host.inject_line("H0");
    for now in [150, 200, 400, 2000] {
        rig.cycle(now);
        assert_eq!(rig.drive.last_call(), Some((0, 0)));
    }
}

#[test]
fn drive_debug_commands_reach_the_drive() {
    let mut rig = Rig::new();

    rig.host.inject_line("SP91");
    rig.cycle(50);
    // Helm is stopped, so its zeroing tick runs after the SP command; the
    // SP report captured the commanded powers first
    let lines = rig.host.written_lines();
    assert!(lines.contains(&"SP80 -80".to_string()), "lines: {:?}", lines);
}

#[test]
fn command_addressing_is_per_module_letter() {
    let mut rig = Rig::new();
    rig.set_heading(0, 0);

    // A line for no registered module is ignored by everyone
    rig.host.inject_line("Q999");
    rig.cycle(50);
    assert_eq!(rig.drive.last_call(), Some((0, 0))); // only the stopped-helm zeroing
}

#[test]
fn rangefinder_module_reports_decoded_channels_in_registry() {
    let host = MockTransport::new();
    let shared = transport::shared(Box::new(host.clone()));
    let telemetry = Telemetry::new(Arc::clone(&shared));

    let (tx, rx) = edge_channel();
    let mut registry = ModuleRegistry::new();
    let module = RangefinderModule::type2(rx, telemetry, 100);
    registry.register(Box::new(module));
    registry.setup_all().unwrap();

    // One well-formed Type-2 frame: channel A (id 0x07 & 0xF3 = 0x03),
    // distance 0x2A
    let mut t = 0u64;
    let value: u16 = 0x072A;
    for k in 0..16 {
        let high = if (value >> k) & 1 == 1 { 266 } else { 532 };
        tx.send(EdgeEvent::rising(t)).unwrap();
        tx.send(EdgeEvent::falling(t + high)).unwrap();
        t += high + 266;
    }

    // Give the decode thread time to commit, then report
    let mut lines = Vec::new();
    for attempt in 0..200u64 {
        thread::sleep(Duration::from_millis(5));
        registry.tick_all(attempt * 200);
        lines = host.written_lines();
        if !lines.is_empty() {
            break;
        }
    }
    assert_eq!(lines, vec!["A2A"]);
}

#[test]
fn mock_transport_line_roundtrip() {
    // The host link carries both directions through one transport
    let host = MockTransport::new();
    host.inject_line("OR100");

    let mut handle = host.clone();
    let mut reader = LineReader::new();
    let lines = reader.poll(&mut handle);
    assert_eq!(lines, vec!["OR100"]);

    handle.write_all(b"OR0 0 180 0 0 0\r\n").unwrap();
    assert_eq!(host.written_lines(), vec!["OR0 0 180 0 0 0"]);
}
