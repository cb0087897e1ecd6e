/// Error types for the ip2mmdb library
use std::fmt;

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, BuildError>;

/// Main error type for a database build
///
/// Every variant is fatal; the message identifies the pipeline stage that
/// failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Input problems: missing/unreadable path, wrong extension, malformed row
    Input(String),

    /// A value exceeded what the MMDB encoding can represent
    Encoding(String),

    /// Failures while writing the output database
    Output(String),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Input(msg) => write!(f, "input error: {}", msg),
            BuildError::Encoding(msg) => write!(f, "encoding overflow: {}", msg),
            BuildError::Output(msg) => write!(f, "output error: {}", msg),
        }
    }
}

impl std::error::Error for BuildError {}

impl From<csv::Error> for BuildError {
    fn from(err: csv::Error) -> Self {
        BuildError::Input(err.to_string())
    }
}
