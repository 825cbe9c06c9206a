//! Audio transcoding between 8kHz network audio and 48kHz hardware audio.
//!
//! The pipeline pairs a logarithmic companding codec (G.711 mu-law) with
//! fixed 6:1 resampling built on a Kaiser-window FIR whose delay line
//! persists across blocks. Protocol state never reaches this crate.

mod error;
pub mod fir;
pub mod pipeline;
pub mod resample;
pub mod ulaw;

pub use error::{Error, Result};
pub use pipeline::{InboundPath, OutboundPath, NARROW_BLOCK, WIDE_BLOCK};
