use thiserror::Error;

/// Errors that can occur while monitoring a graph run
#[derive(Error, Debug)]
pub enum WatchtowerError {
    /// Invalid configuration value
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Error reading the configuration file
    #[error("failed to read config file: {0}")]
    ConfigFileError(#[source] std::io::Error),

    /// Error parsing JSON from a recorded trace
    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    /// Error reading a recorded trace file
    #[error("failed to read trace file: {0}")]
    TraceReadError(#[source] std::io::Error),

    /// The underlying event stream failed
    #[error("event stream error: {0}")]
    StreamError(String),

    /// The loop callback failed (a deliberate stop is not an error)
    #[error("loop callback failed: {0}")]
    CallbackError(String),

    /// Error writing human-facing output
    #[error("failed to write report: {0}")]
    ReportError(#[source] std::io::Error),

    /// The unmonitored graph invocation failed
    #[error("graph execution failed: {0}")]
    GraphError(String),
}

/// Result type alias for watchtower operations
pub type Result<T> = std::result::Result<T, WatchtowerError>;
