// src/test_log.rs
use log::{LevelFilter, Log, Metadata, Record};
use std::sync::{Mutex, Once};

struct CaptureLogger {
    lines: Mutex<Vec<String>>,
}

static LOGGER: CaptureLogger = CaptureLogger {
    lines: Mutex::new(Vec::new()),
};
static INSTALL: Once = Once::new();

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(format!("{}", record.args()));
        }
    }

    fn flush(&self) {}
}

/// Routes every `log` record in this test binary into memory. Tests run in parallel,
/// so assertions should look for text unique to the test.
pub fn capture_logs() {
    INSTALL.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
}

pub fn logged(needle: &str) -> bool {
    LOGGER
        .lines
        .lock()
        .map(|lines| lines.iter().any(|l| l.contains(needle)))
        .unwrap_or(false)
}
