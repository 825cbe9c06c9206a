//! Error types for linkhub-audio.

/// Result type alias for linkhub-audio.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for transcoding operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// A pipeline entry point was handed a block of the wrong size.
    ///
    /// Block sizes are fixed by the 20ms frame cadence; a mismatch is a
    /// caller bug, not a runtime condition to recover from.
    #[error("bad block size: got {got} samples, need {need}")]
    BlockSize { got: usize, need: usize },
}
