//! Internal logging system for the Lumen engine
//!
//! Every recoverable diagnostic of the device layer and the render queues
//! goes through this module:
//! - Pluggable sink via the Logger trait
//! - Severity levels (Trace, Debug, Info, Warn, Error)
//! - Colored console output by default
//! - File and line information on ERROR entries

use colored::*;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Logger trait for custom logging sinks
///
/// # Example
///
/// ```no_run
/// use lumen_engine::lumen::log::{Logger, LogEntry};
///
/// struct FrameLogger;
///
/// impl Logger for FrameLogger {
///     fn log(&self, entry: &LogEntry) {
///         // forward to an in-game console...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Handle one log entry
    fn log(&self, entry: &LogEntry);
}

/// One log record
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level
    pub severity: LogSeverity,

    /// Timestamp when the entry was created
    pub timestamp: SystemTime,

    /// Emitting component (e.g. "lumen::Buffer", "lumen::ProgramLib")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (ERROR entries only)
    pub file: Option<&'static str>,

    /// Source line (ERROR entries only)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogSeverity {
    /// Fixed-width label used by the console logger
    pub fn label(&self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }
}

/// Console logger used until a custom logger is installed
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
pub struct DefaultLogger;

impl DefaultLogger {
    fn format_timestamp(timestamp: SystemTime) -> String {
        let datetime: DateTime<Local> = timestamp.into();
        datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let timestamp = Self::format_timestamp(entry.timestamp);

        let label = entry.severity.label();
        let severity_str = match entry.severity {
            LogSeverity::Trace => label.bright_black(),
            LogSeverity::Debug => label.cyan(),
            LogSeverity::Info => label.green(),
            LogSeverity::Warn => label.yellow(),
            LogSeverity::Error => label.red().bold(),
        };
        let source = entry.source.bright_blue();

        match (entry.file, entry.line) {
            (Some(file), Some(line)) => println!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, severity_str, source, entry.message, file, line
            ),
            _ => println!(
                "[{}] [{}] [{}] {}",
                timestamp, severity_str, source, entry.message
            ),
        }
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::lumen::Engine::log(
            $crate::lumen::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message
///
/// # Example
///
/// ```ignore
/// engine_debug!("lumen::Buffer", "Created buffer {} ({} bytes)", id, size);
/// ```
#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::lumen::Engine::log(
            $crate::lumen::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message
#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::lumen::Engine::log(
            $crate::lumen::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message (recoverable misuse, degraded behavior)
///
/// # Example
///
/// ```ignore
/// engine_warn!("lumen::Buffer", "Cannot resize buffer view {}", id);
/// ```
#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::lumen::Engine::log(
            $crate::lumen::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::lumen::Engine::log_detailed(
            $crate::lumen::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an ERROR message and build the matching `Error::InvalidResource`
///
/// # Example
///
/// ```ignore
/// let sub_model = model.sub_model(index)
///     .ok_or_else(|| engine_err!("lumen::AdditiveLightQueue", "SubModel {} not found", index))?;
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::lumen::Error::InvalidResource(message)
    }};
}

/// Log an ERROR message and return `Err(Error::InvalidResource)` from the caller
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

// ===== TEST CAPTURE =====

/// Logger that stores entries for later inspection (unit tests only)
#[cfg(test)]
pub(crate) struct CaptureLogger {
    entries: std::sync::Arc<std::sync::Mutex<Vec<LogEntry>>>,
}

#[cfg(test)]
impl CaptureLogger {
    /// Install a capture logger as the engine logger and return its entry list
    pub(crate) fn install() -> std::sync::Arc<std::sync::Mutex<Vec<LogEntry>>> {
        let entries = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        crate::engine::Engine::set_logger(CaptureLogger { entries: entries.clone() });
        entries
    }

    /// Count captured entries of a severity whose message contains `needle`
    pub(crate) fn count(
        entries: &std::sync::Arc<std::sync::Mutex<Vec<LogEntry>>>,
        severity: LogSeverity,
        needle: &str,
    ) -> usize {
        entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.severity == severity && e.message.contains(needle))
            .count()
    }
}

#[cfg(test)]
impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
