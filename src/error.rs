//! Error types for disha-odom

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// disha-odom error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame does not carry scan data
    #[error("Not a scan telegram")]
    NotAScan,

    /// Malformed telegram content
    #[error("Invalid telegram: {0}")]
    InvalidTelegram(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection closed by peer
    #[error("Connection closed")]
    Disconnected,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {e}"))
    }
}
