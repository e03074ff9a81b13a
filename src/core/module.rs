//! Module contract and cooperative scheduler
//!
//! Every hardware-facing unit implements [`Module`]; the daemon holds an
//! ordered collection of them and polls each one per scheduler tick. The
//! contract is cooperative: a tick never overlaps another tick, so modules
//! share the telemetry link without locking discipline beyond it. Only the
//! decode threads (the interrupt stand-ins) preempt, and they touch nothing
//! a tick writes.
//!
//! # Command addressing
//!
//! Each module has an assigned leading letter and only responds to lines
//! starting with it. There is no central dispatch table: `on_command` is
//! called for every inbound line on every module, and each module filters
//! for itself. This is an intentional convention inherited from the wire
//! protocol, not an enforced invariant.

use crate::error::Result;

/// A self-contained hardware module hosted by the scheduler.
pub trait Module: Send {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Called exactly once before any tick. Hardware init failures are
    /// fatal here and abort daemon startup; nothing after setup may fail
    /// that way.
    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called repeatedly with the current monotonic time in ms. Must not
    /// block; long operations belong in setup or in a decode thread.
    fn tick(&mut self, now_ms: u64);

    /// Called for every inbound host line. Modules inspect their own
    /// reserved leading letter and otherwise no-op.
    fn on_command(&mut self, line: &str) {
        let _ = line;
    }
}

/// Ordered collection of modules. Insertion order is poll and report order;
/// it is not functionally significant but is kept stable for reproducible
/// behavior.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Box<dyn Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module to the end of the poll order
    pub fn register(&mut self, module: Box<dyn Module>) {
        log::debug!("Registered module '{}'", module.name());
        self.modules.push(module);
    }

    /// Run setup on every module in registration order. The first failure
    /// halts further setup progress and is returned.
    pub fn setup_all(&mut self) -> Result<()> {
        for module in &mut self.modules {
            log::info!("Setting up module '{}'", module.name());
            module.setup()?;
        }
        Ok(())
    }

    /// Poll every module once, in registration order
    pub fn tick_all(&mut self, now_ms: u64) {
        for module in &mut self.modules {
            module.tick(now_ms);
        }
    }

    /// Hand an inbound line to every module
    pub fn dispatch_line(&mut self, line: &str) {
        log::trace!("Dispatching line: {:?}", line);
        for module in &mut self.modules {
            module.on_command(line);
        }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        tag: char,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Module for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn setup(&mut self) -> Result<()> {
            self.events.lock().unwrap().push(format!("setup {}", self.tag));
            Ok(())
        }

        fn tick(&mut self, now_ms: u64) {
            self.events
                .lock()
                .unwrap()
                .push(format!("tick {} {}", self.tag, now_ms));
        }

        fn on_command(&mut self, line: &str) {
            // Convention: filter on our own leading letter
            if line.starts_with(self.tag) {
                self.events
                    .lock()
                    .unwrap()
                    .push(format!("cmd {} {}", self.tag, line));
            }
        }
    }

    fn rig() -> (ModuleRegistry, Arc<Mutex<Vec<String>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        for tag in ['A', 'B'] {
            registry.register(Box::new(Recorder {
                tag,
                events: Arc::clone(&events),
            }));
        }
        (registry, events)
    }

    #[test]
    fn test_setup_then_ticks_in_registration_order() {
        let (mut registry, events) = rig();
        registry.setup_all().unwrap();
        registry.tick_all(5);
        registry.tick_all(10);

        let log = events.lock().unwrap().clone();
        assert_eq!(
            log,
            vec!["setup A", "setup B", "tick A 5", "tick B 5", "tick A 10", "tick B 10"]
        );
    }

    #[test]
    fn test_lines_broadcast_to_all_modules() {
        let (mut registry, events) = rig();
        registry.dispatch_line("B1 hello");
        registry.dispatch_line("Znot for anyone");

        let log = events.lock().unwrap().clone();
        // Only the addressed module reacted; the unaddressed line was
        // delivered everywhere but ignored by convention.
        assert_eq!(log, vec!["cmd B B1 hello"]);
    }

    #[test]
    fn test_setup_failure_halts_progress() {
        struct Failing;
        impl Module for Failing {
            fn name(&self) -> &'static str {
                "failing"
            }
            fn setup(&mut self) -> Result<()> {
                Err(crate::Error::InitializationFailed("sensor not detected".into()))
            }
            fn tick(&mut self, _now_ms: u64) {}
        }

        let events = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register(Box::new(Failing));
        registry.register(Box::new(Recorder {
            tag: 'A',
            events: Arc::clone(&events),
        }));

        assert!(registry.setup_all().is_err());
        // The module after the failing one was never set up
        assert!(events.lock().unwrap().is_empty());
    }
}
