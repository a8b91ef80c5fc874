//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry, DefaultLogger and the logging macros.

use crate::engine::Engine;
use crate::log::{CaptureLogger, DefaultLogger, LogEntry, LogSeverity, Logger};
use serial_test::serial;
use std::time::SystemTime;

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_labels_are_fixed_width() {
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        assert_eq!(severity.label().len(), 5);
    }
    assert_eq!(LogSeverity::Warn.label(), "WARN ");
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_does_not_panic() {
    let logger = DefaultLogger;
    logger.log(&LogEntry {
        severity: LogSeverity::Info,
        timestamp: SystemTime::now(),
        source: "lumen::test".to_string(),
        message: "plain entry".to_string(),
        file: None,
        line: None,
    });
    logger.log(&LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "lumen::test".to_string(),
        message: "detailed entry".to_string(),
        file: Some("log_tests.rs"),
        line: Some(42),
    });
}

// ============================================================================
// MACRO TESTS
// ============================================================================

#[test]
#[serial]
fn test_macros_route_to_installed_logger() {
    let entries = CaptureLogger::install();

    crate::engine_trace!("lumen::test", "trace {}", 1);
    crate::engine_debug!("lumen::test", "debug {}", 2);
    crate::engine_info!("lumen::test", "info {}", 3);
    crate::engine_warn!("lumen::test", "warn {}", 4);
    crate::engine_error!("lumen::test", "error {}", 5);

    {
        let captured = entries.lock().unwrap();
        let ours: Vec<_> = captured.iter().filter(|e| e.source == "lumen::test").collect();
        assert_eq!(ours.len(), 5);
        assert_eq!(ours[0].severity, LogSeverity::Trace);
        assert_eq!(ours[3].message, "warn 4");
        assert!(ours[3].file.is_none());
        assert_eq!(ours[4].severity, LogSeverity::Error);
        assert!(ours[4].file.is_some());
        assert!(ours[4].line.is_some());
    }

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_engine_err_logs_an_error_entry() {
    let entries = CaptureLogger::install();

    let _ = crate::engine_err!("lumen::test", "broken {}", "slot");

    assert_eq!(CaptureLogger::count(&entries, LogSeverity::Error, "broken slot"), 1);

    Engine::reset_logger();
}
