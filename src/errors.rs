use thiserror::Error;

/// The central error type for the UI health monitor.
///
/// Host capability failures and tracker failures are kept apart so callers
/// can tell "the UI is broken" from "we could not tell anyone about it".
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures of the host UI capability surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Element '{id}' not found")]
    ElementNotFound { id: String },

    #[error("Capability '{name}' is not defined")]
    CapabilityMissing { name: String },

    #[error("Element '{id}' has no parent to replace it in")]
    Detached { id: String },

    #[error("Operation not supported by this host: {0}")]
    Unsupported(String),
}

/// Failures of the issue-creation capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("Issue tracker token not configured")]
    MissingCredential,

    #[error("Issue tracker returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse tracker response: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_TRACKER_ERROR: u8 = 4;

/// Determine the appropriate process exit code for an error.
pub fn get_exit_code(e: &anyhow::Error) -> u8 {
    if let Some(monitor_err) = e.downcast_ref::<MonitorError>() {
        return match monitor_err {
            MonitorError::Config(_) => EXIT_CONFIG_ERROR,
            MonitorError::Report(_) => EXIT_TRACKER_ERROR,
            _ => EXIT_ERROR,
        };
    }

    if e.downcast_ref::<ReportError>().is_some() {
        return EXIT_TRACKER_ERROR;
    }

    if e.downcast_ref::<toml::de::Error>().is_some() {
        return EXIT_CONFIG_ERROR;
    }

    EXIT_ERROR
}
