use env_logger::Env;

use crate::error::ConvertError;

const LOG_TARGET: &str = "meshweave";

/// ログレベル定義
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// Initialize the logging system.
///
/// `RUST_LOG` wins over `default_filter` when it is set.
pub fn init_logging(default_filter: &str) {
    if let Err(e) = env_logger::Builder::from_env(Env::default().default_filter_or(default_filter))
        .try_init()
    {
        eprintln!("Warning: Logging system already initialized: {}", e);
    }
}

/// Send a log message through the `log` facade.
pub fn send_log(level: LogLevel, message: &str) {
    log::log!(target: LOG_TARGET, level.into(), "{}", message);
}

/// Log a ConvertError with automatic error-level logging
pub fn log_convert_error(error: &ConvertError, context: Option<&str>) {
    let message = match context {
        Some(ctx) => format!("{}: {}", ctx, error),
        None => error.to_string(),
    };

    send_log(LogLevel::Error, &message);
}

/// Convenience macros for logging
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::send_log($crate::logging::LogLevel::Debug, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::send_log($crate::logging::LogLevel::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::send_log($crate::logging::LogLevel::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::send_log($crate::logging::LogLevel::Error, &format!($($arg)*))
    };
}

/// Result extension for convenient error logging
pub trait ResultExt<T, E> {
    fn log_error(self, context: Option<&str>) -> Self;
}

impl<T> ResultExt<T, ConvertError> for Result<T, ConvertError> {
    fn log_error(self, context: Option<&str>) -> Self {
        if let Err(ref error) = self {
            log_convert_error(error, context);
        }
        self
    }
}
