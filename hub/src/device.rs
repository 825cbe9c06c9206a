//! Hardware audio boundary.
//!
//! The scheduler never blocks on audio: capture hands over a whole
//! wide-band block or nothing, playback accepts a block and reports (but
//! never escalates) failures. The real cpal-backed implementation lives in
//! the binary; tests use in-memory stubs.

use std::io;

/// Non-blocking capture of wide-band PCM.
pub trait AudioInput {
    /// Returns one whole 960-sample block if the hardware has it ready,
    /// otherwise nothing. Must not block.
    fn read_block(&mut self) -> Option<Vec<i16>>;
}

/// Playback of wide-band PCM.
pub trait AudioOutput {
    /// Writes one block. Errors are logged by the caller and are
    /// non-fatal.
    fn write(&mut self, pcm: &[i16]) -> io::Result<()>;
}
