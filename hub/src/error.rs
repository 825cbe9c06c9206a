//! Error types for linkhub-hub.

use std::io;

/// Result type alias for linkhub-hub.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for hub operations.
///
/// Only startup paths treat these as fatal; everything reachable from the
/// running loop is logged and recovered locally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The trusted public key could not be loaded.
    #[error("invalid public key: {0}")]
    Key(String),

    /// Configuration file missing, unreadable, or malformed.
    #[error("invalid config: {0}")]
    Config(String),

    /// The directory service was unreachable or rejected the announcement.
    #[error("registration failed: {0}")]
    Registration(String),
}
