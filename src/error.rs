//! Error types for SarathiIO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// SarathiIO error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Invalid or incomplete configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Unknown hardware backend requested in config
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// An input pin is already bound to a decoder
    #[error("Pin {0} already bound")]
    PinInUse(u8),

    /// Sensor hardware failed to initialize
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// A shared mutex was poisoned by a panicking thread
    #[error("Mutex poisoned")]
    MutexPoisoned,

    /// A worker thread panicked
    #[error("Thread panicked")]
    ThreadPanic,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
