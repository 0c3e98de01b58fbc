//! File log for pipeline runs.
//!
//! `tracing` covers console output; this log keeps a durable trail of
//! processing runs (start/finish markers, per-slide failures) under the
//! user's data directory so background jobs can be inspected afterwards.

use chrono::Local;
use lazy_static::lazy_static;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

lazy_static! {
    static ref LOG_FILE: Mutex<Option<File>> = Mutex::new(None);
}

/// Initialize the log file
pub fn init_logger() -> anyhow::Result<()> {
    init_logger_at(get_log_path())
}

/// Initialize the log file at an explicit location
pub fn init_logger_at(log_path: PathBuf) -> anyhow::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    let _ = writeln!(file, "\n=== Slidesum Session Started at {} ===\n", timestamp);

    if let Ok(mut log_file) = LOG_FILE.lock() {
        *log_file = Some(file);
    }

    Ok(())
}

fn get_log_path() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("slidesum").join("slidesum.log")
    } else {
        PathBuf::from("slidesum.log")
    }
}

/// Log a message to file. A no-op until [`init_logger`] has run.
pub fn log(level: &str, message: &str) {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    let formatted = format!("[{}] {}: {}", timestamp, level, message);

    if let Ok(mut log_file) = LOG_FILE.lock() {
        if let Some(ref mut f) = *log_file {
            let _ = writeln!(f, "{}", formatted);
            let _ = f.flush();
        }
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::log("INFO", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::log("WARN", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::log("ERROR", &format!($($arg)*));
    };
}

/// Get the current log file path for display
pub fn get_log_path_display() -> String {
    get_log_path().display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_session_marker_and_messages() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs").join("run.log");

        init_logger_at(path.clone()).unwrap();
        crate::log_info!("processing {} slides", 12);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Slidesum Session Started"));
        assert!(content.contains("INFO: processing 12 slides"));
    }
}
