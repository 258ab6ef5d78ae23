//! Error handling for the host telemetry crate.

/// A specialized `Result` type for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// The main error type for telemetry operations.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// System information parsing failed
    #[error("Failed to parse system information: {0}")]
    ParseError(String),

    /// The CPU usage query could not be opened
    #[error("Failed to open CPU usage query: {0}")]
    QueryOpen(String),

    /// The counter could not be registered against an open query
    #[error("Failed to add counter '{path}': {reason}")]
    CounterAdd { path: String, reason: String },

    /// Sampling was attempted before a successful initialize
    #[error("CPU sampler has not been initialized")]
    SamplerNotInitialized,

    /// Sampling or initialization was attempted after shutdown
    #[error("CPU sampler has been shut down")]
    SamplerClosed,

    /// The host cannot provide this information
    #[error("Not supported on this platform: {0}")]
    Unsupported(&'static str),

    /// No mounted filesystem contains the requested path
    #[error("No mounted volume found for '{0}'")]
    VolumeNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic system error
    #[error("System error: {0}")]
    System(String),
}

impl TelemetryError {
    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a new counter registration error
    pub fn counter_add(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CounterAdd {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new generic system error
    #[allow(clippy::self_named_constructors)]
    pub fn system_error(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }
}
