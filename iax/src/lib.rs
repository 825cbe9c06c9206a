//! IAX2 wire frame codec.
//!
//! Pure transforms between datagram bytes and typed frames: full frames,
//! compact mini voice frames, and the tagged information elements some full
//! frames carry. No I/O and no protocol state lives here.

mod error;
pub mod frame;
pub mod ie;

pub use error::{Error, Result};
pub use frame::{Frame, FullFrame, MiniFrame};
pub use ie::InfoElements;
