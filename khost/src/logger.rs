use log::{Level, LevelFilter, Log, Metadata, Record};

struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }
    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let module_path = record.module_path().unwrap_or_default();
        match record.level() {
            Level::Error => {
                eprintln!("[ERROR] [{}] {}", module_path, record.args());
            }
            Level::Warn => {
                eprintln!("[ WARN] [{}] {}", module_path, record.args());
            }
            Level::Info => {
                eprintln!("[ INFO] [{}] {}", module_path, record.args());
            }
            Level::Debug => {
                eprintln!("[DEBUG] [{}] {}", module_path, record.args());
            }
            Level::Trace => {
                eprintln!("[TRACE] [{}] {}", module_path, record.args());
            }
        };
    }
    fn flush(&self) {}
}

static LOGGER: SimpleLogger = SimpleLogger;

/// Installs the logger. Safe to call more than once; later calls are no-ops.
pub fn init_logger() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(match std::env::var("LOG").as_deref() {
            Ok("ERROR") => LevelFilter::Error,
            Ok("WARN") => LevelFilter::Warn,
            Ok("INFO") => LevelFilter::Info,
            Ok("DEBUG") => LevelFilter::Debug,
            Ok("TRACE") => LevelFilter::Trace,
            _ => LevelFilter::Info,
        });
    }
}
