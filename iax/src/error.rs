//! Error types for linkhub-iax.

/// Result type alias for linkhub-iax.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for frame decoding.
///
/// Decode errors mean the datagram is not a well-formed frame and must be
/// dropped; they never indicate a local fault.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// Datagram shorter than the minimum header for its frame kind.
    #[error("frame too short: {got} bytes, need {need}")]
    ShortFrame { got: usize, need: usize },

    /// Information element stream ended in the middle of an element.
    #[error("truncated information element {id}")]
    TruncatedElement { id: u8 },
}
