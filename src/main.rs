//! SarathiIO - control daemon for a modular single-board rover controller
//!
//! ## Architecture
//!
//! One cooperative scheduler thread polls the module registry (attitude,
//! heading controller, drive, RPM counter, rangefinder decoders) and routes
//! newline-terminated command lines from the host serial link to every
//! module. Pulse-width decoding runs on per-pin decode threads - the
//! software stand-in for edge interrupts - and hands committed frames to
//! the tick through single-writer cells.

use sarathi_io::config::{Config, RangefinderKind};
use sarathi_io::core::types::{AttitudeState, ImuSample};
use sarathi_io::core::{Clock, ModuleRegistry};
use sarathi_io::decode::edge::edge_channel;
use sarathi_io::decode::PinTable;
use sarathi_io::devices;
use sarathi_io::error::Result;
use sarathi_io::line::LineReader;
use sarathi_io::modules::drive::{shared_drive, PwmDrive};
use sarathi_io::modules::{
    AhrsModule, DriveModule, HelmModule, ImuModule, RangefinderModule, RpmModule,
};
use sarathi_io::telemetry::Telemetry;
use sarathi_io::transport::{self, SerialTransport};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Scheduler idle sleep between ticks
const TICK_SLEEP_MS: u64 = 2;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `sarathi-io <path>` (positional)
/// - `sarathi-io --config <path>` (flag-based)
/// - `sarathi-io -c <path>` (short flag)
///
/// Defaults to `/etc/sarathi.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    "/etc/sarathi.toml".to_string()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("SarathiIO v0.2.0 starting...");

    let config_path = parse_config_path();
    log::info!("Using config: {}", config_path);
    let config = Config::from_file(&config_path)?;

    // Host link: command input and telemetry output share one port
    let host = transport::shared(Box::new(SerialTransport::open(
        &config.host.port,
        config.host.baud,
    )?));
    let telemetry = Telemetry::new(Arc::clone(&host));

    // Hardware seams
    let backend = devices::create_backend(&config)?;
    log::info!("Backend: {}", config.device.backend);

    // Shared state between modules
    let attitude = Arc::new(AttitudeState::new());
    let sample_share = Arc::new(Mutex::new(ImuSample::zero()));
    let drive = shared_drive(Box::new(PwmDrive::new(
        backend.motor_outputs,
        config.drive.reverse_left,
        config.drive.reverse_right,
    )));

    // Module registry; insertion order is poll and report order
    let mut registry = ModuleRegistry::new();
    registry.register(Box::new(AhrsModule::new(
        backend.imu,
        backend.estimator,
        Arc::clone(&attitude),
        Arc::clone(&sample_share),
        telemetry.clone(),
        config.ahrs.report_interval_ms,
    )));
    registry.register(Box::new(ImuModule::new(
        Arc::clone(&sample_share),
        telemetry.clone(),
        config.imu.report_interval_ms,
    )));
    registry.register(Box::new(HelmModule::new(
        &config.helm,
        Arc::clone(&attitude),
        Arc::clone(&drive),
        telemetry.clone(),
    )));
    registry.register(Box::new(DriveModule::new(
        Arc::clone(&drive),
        telemetry.clone(),
        config.drive.report_interval_ms,
    )));

    // Decoder instances, one pin each
    let mut pins = PinTable::new();
    if let Some(ref rpm) = config.rpm {
        let (tx, rx) = edge_channel();
        pins.bind(rpm.pin, tx)?;
        registry.register(Box::new(RpmModule::new(
            rx,
            telemetry.clone(),
            rpm.reaction_window_ms,
            rpm.report_interval_ms,
        )));
    }
    for rangefinder in &config.rangefinder {
        let (tx, rx) = edge_channel();
        pins.bind(rangefinder.pin, tx)?;
        let module = match rangefinder.kind {
            RangefinderKind::Type1 => {
                RangefinderModule::type1(rx, telemetry.clone(), rangefinder.report_interval_ms)
            }
            RangefinderKind::Type2 => {
                RangefinderModule::type2(rx, telemetry.clone(), rangefinder.report_interval_ms)
            }
        };
        registry.register(Box::new(module));
    }
    let _edge_sources = devices::start_edge_sources(&config, pins)?;

    // Hardware init failures are fatal here, before the loop starts
    registry.setup_all()?;
    log::info!("{} modules ready", registry.len());

    // Shutdown signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| sarathi_io::Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    log::info!("SarathiIO running. Press Ctrl-C to stop.");

    // Scheduler loop: drain host lines, broadcast, tick every module
    let clock = Clock::new();
    let mut reader = LineReader::new();
    while running.load(Ordering::Relaxed) {
        let lines = {
            // Scoped lock: telemetry writers need the transport during
            // dispatch and tick
            let Ok(mut transport) = host.lock() else {
                log::error!("Host transport mutex poisoned, exiting");
                break;
            };
            reader.poll(&mut **transport)
        };
        for line in lines {
            registry.dispatch_line(&line);
        }
        registry.tick_all(clock.now_ms());
        thread::sleep(Duration::from_millis(TICK_SLEEP_MS));
    }

    // Shutdown: motors off before the drive drops
    log::info!("Shutting down...");
    if let Ok(mut drive) = drive.lock() {
        drive.set_powers(0, 0);
    }

    log::info!("SarathiIO stopped");
    Ok(())
}
