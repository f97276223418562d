use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{Level, LevelFilter, Log, Metadata, Record};

static LOG_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install the logger. The level is taken from the `LOG` environment
/// variable; kernel output goes to host stderr, never to the simulated
/// console.
pub fn init() {
    static LOGGER: SimpleLogger = SimpleLogger;
    if LOG_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(match std::env::var("LOG").as_deref() {
        Ok("error") => LevelFilter::Error,
        Ok("warn") => LevelFilter::Warn,
        Ok("info") => LevelFilter::Info,
        Ok("debug") => LevelFilter::Debug,
        Ok("trace") => LevelFilter::Trace,
        _ => LevelFilter::Error,
    });
}

struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let color = level_to_color_code(record.level());
        let mut err = std::io::stderr().lock();
        let _ = writeln!(
            err,
            "\u{1B}[{}m[{:>5}][{}:{}][{:?}] {}\u{1B}[0m",
            color,
            record.level(),
            record.file().unwrap_or("?"),
            record.line().unwrap_or(0),
            std::thread::current().id(),
            record.args()
        );
    }

    fn flush(&self) {}
}

pub fn level_to_color_code(level: Level) -> u8 {
    match level {
        Level::Error => 31, // Red
        Level::Warn => 93,  // BrightYellow
        Level::Info => 36,  // Blue
        Level::Debug => 32, // Green
        Level::Trace => 90, // BrightBlack
    }
}
