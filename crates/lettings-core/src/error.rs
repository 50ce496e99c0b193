use thiserror::Error;

/// Top-level error type for the lettings workspace.
///
/// Subsystem crates either use these variants directly or define their own
/// error types with a `From` conversion so `?` works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LettingsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not connected to the data store")]
    NotConnected,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl From<toml::de::Error> for LettingsError {
    fn from(err: toml::de::Error) -> Self {
        LettingsError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LettingsError {
    fn from(err: toml::ser::Error) -> Self {
        LettingsError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for LettingsError {
    fn from(err: serde_json::Error) -> Self {
        LettingsError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for lettings operations.
pub type Result<T> = std::result::Result<T, LettingsError>;
