//! Logging setup for applications embedding the subscription engine
//!
//! The engine itself only emits `tracing` events. Nothing is printed until
//! the host installs a subscriber, either its own or one of the presets here.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Environment variable selecting the logging mode
pub const LOG_MODE_ENV: &str = "OPCUA_SUB_LOG_MODE";

/// Environment variable overriding the filter directive
pub const LOG_LEVEL_ENV: &str = "OPCUA_SUB_LOG_LEVEL";

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber is installed
    Silent,
    /// Compact stderr output
    Development,
    /// Verbose output with thread ids and source locations
    Debug,
    /// One JSON object per line, for log collectors
    Json,
}

impl LoggingMode {
    /// Parse the value of [`LOG_MODE_ENV`]; unknown values map to `None`
    pub fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "silent" => Some(LoggingMode::Silent),
            "development" | "dev" => Some(LoggingMode::Development),
            "debug" => Some(LoggingMode::Debug),
            "json" => Some(LoggingMode::Json),
            _ => None,
        }
    }
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid environment variable: {0}")]
    InvalidEnv(String),
}

/// Initialize logging with the specified mode
///
/// # Examples
///
/// ```rust,ignore
/// opcua_subscription::logging::init_logging(LoggingMode::Development)?;
/// ```
///
/// # Environment Variables
///
/// - `OPCUA_SUB_LOG_LEVEL`: filter directive, e.g. `opcua_subscription=debug`
/// - `RUST_LOG`: used when the above is unset
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = create_env_filter("info")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .compact(),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let filter = create_env_filter("debug")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .pretty()
                        .with_thread_ids(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Json => {
            let filter = create_env_filter("info")?;

            Registry::default()
                .with(fmt::layer().json().with_current_span(false))
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// Initialize logging from `OPCUA_SUB_LOG_MODE`
///
/// Unset selects silent mode. An unrecognised value is an error rather than
/// a silent fallback.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = match std::env::var(LOG_MODE_ENV) {
        Ok(value) => LoggingMode::from_env_value(&value).ok_or_else(|| {
            LoggingError::InvalidEnv(format!("{}={}", LOG_MODE_ENV, value))
        })?,
        Err(_) => LoggingMode::Silent,
    };

    init_logging(mode)
}

/// Create an environment filter with fallback to default level
fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let directive = std::env::var(LOG_LEVEL_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level.to_string());

    EnvFilter::try_new(&directive)
        .map_err(|e| LoggingError::InvalidEnv(format!("{}: {}", directive, e)))
}

/// Check if a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_silent_mode() {
        assert!(init_logging(LoggingMode::Silent).is_ok());
    }

    #[rstest]
    #[case("silent", Some(LoggingMode::Silent))]
    #[case("Development", Some(LoggingMode::Development))]
    #[case("dev", Some(LoggingMode::Development))]
    #[case(" debug ", Some(LoggingMode::Debug))]
    #[case("json", Some(LoggingMode::Json))]
    #[case("verbose", None)]
    fn test_mode_from_env_value(#[case] value: &str, #[case] expected: Option<LoggingMode>) {
        assert_eq!(LoggingMode::from_env_value(value), expected);
    }

    #[test]
    fn test_default_filter() {
        assert!(create_env_filter("warn").is_ok());
    }
}
