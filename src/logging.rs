use crate::error::RigError;

/// Target every rigging log record is emitted under.
pub const LOG_TARGET: &str = "autorig";

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Forward a message to the `tracing` subscriber at the given level.
///
/// Without an installed subscriber the record is dropped.
pub fn send_log(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!(target: LOG_TARGET, "{message}"),
        LogLevel::Info => tracing::info!(target: LOG_TARGET, "{message}"),
        LogLevel::Warn => tracing::warn!(target: LOG_TARGET, "{message}"),
        LogLevel::Error => tracing::error!(target: LOG_TARGET, "{message}"),
    }
}

/// Log a RigError at error level, prefixed with an optional context.
pub fn log_rig_error(error: &RigError, context: Option<&str>) {
    let message = match context {
        Some(ctx) => format!("{}: {}", ctx, error),
        None => error.to_string(),
    };

    send_log(LogLevel::Error, &message);
}

#[doc(hidden)]
pub use tracing as __tracing;

/// Convenience macros for logging. Arguments are only formatted when the
/// level is enabled.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::debug!(target: $crate::logging::LOG_TARGET, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::info!(target: $crate::logging::LOG_TARGET, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::warn!(target: $crate::logging::LOG_TARGET, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::error!(target: $crate::logging::LOG_TARGET, $($arg)*)
    };
}

/// Result extension for convenient error logging
pub trait ResultExt<T, E> {
    fn log_error(self, context: Option<&str>) -> Self;
}

impl<T> ResultExt<T, RigError> for Result<T, RigError> {
    fn log_error(self, context: Option<&str>) -> Self {
        if let Err(ref error) = self {
            log_rig_error(error, context);
        }
        self
    }
}
