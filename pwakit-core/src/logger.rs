//! Bridge from the `log` facade to a host supplied logger.

use std::sync::{Arc, OnceLock};

/// Trait representing a logger that can log messages at various levels.
///
/// The host (browser console, test harness) implements this trait and hands it to
/// [`set_logger`]; every `log` record emitted by the crate is then forwarded to it.
///
/// # Examples
///
/// ```rust
/// use pwakit_core::logger::{Logger, LogLevel};
///
/// struct MyLogger;
///
/// impl Logger for MyLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         println!("[{:?}] {}", level, message);
///     }
/// }
/// ```
pub trait Logger: Sync + Send {
    /// Logs a message at the specified log level.
    ///
    /// # Arguments
    ///
    /// * `level` - The severity level of the log message.
    /// * `message` - The log message to be recorded.
    fn log(&self, level: LogLevel, message: String);
}

/// Enumeration of possible log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Designates very low priority, often extremely detailed messages.
    Trace,
    /// Designates lower priority debugging information.
    Debug,
    /// Designates informational messages that highlight the progress of the application.
    Info,
    /// Designates potentially harmful situations.
    Warn,
    /// Designates error events that might still allow the application to continue running.
    Error,
}

/// Forwards `log` records to the host supplied [`Logger`].
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if !should_forward(record.level(), record.module_path()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(log_level(record.level()), format!("{}", record.args()));
        }
    }

    fn flush(&self) {}
}

/// Debug and trace records are only forwarded when they originate from this crate family.
fn should_forward(level: log::Level, module_path: Option<&str>) -> bool {
    let is_from_pwakit = module_path.is_some_and(|path| path.starts_with("pwakit"));
    let is_debug_or_trace = level == log::Level::Debug || level == log::Level::Trace;
    is_from_pwakit || !is_debug_or_trace
}

/// Converts a `log::Level` to a `LogLevel`.
const fn log_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warn,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug => LogLevel::Debug,
        log::Level::Trace => LogLevel::Trace,
    }
}

/// The host supplied logger, set once.
static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Sets the global logger.
///
/// Only the first call installs a logger; later calls are ignored.
pub fn set_logger(logger: Arc<dyn Logger>) {
    static LOGGER: ForeignLogger = ForeignLogger;

    if LOGGER_INSTANCE.set(logger).is_err() {
        return;
    }

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_records_from_dependencies_are_dropped() {
        assert!(should_forward(log::Level::Debug, Some("pwakit_core::agent")));
        assert!(should_forward(log::Level::Trace, Some("pwakit_wasm")));
        assert!(!should_forward(log::Level::Debug, Some("reqwest::connect")));
        assert!(!should_forward(log::Level::Trace, None));
        assert!(should_forward(log::Level::Warn, Some("reqwest::connect")));
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(log_level(log::Level::Error), LogLevel::Error);
        assert_eq!(log_level(log::Level::Trace), LogLevel::Trace);
    }
}
