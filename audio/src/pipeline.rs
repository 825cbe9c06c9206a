//! The two transcoding paths bridging hardware and network audio.
//!
//! Outbound: one 960-sample wide-band capture block in, one 160-byte
//! mu-law block out. Inbound: one 160-byte mu-law block in, one 960-sample
//! wide-band playback block out. Each path owns its resampler so filter
//! state persists for the life of the process.

use crate::error::{Error, Result};
use crate::resample::{Downsampler, Upsampler};
use crate::ulaw;

/// Narrow-band samples per 20ms frame.
pub const NARROW_BLOCK: usize = 160;

/// Wide-band samples per 20ms frame.
pub const WIDE_BLOCK: usize = 960;

fn clamp_sample(v: f64) -> i16 {
    v.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Hardware capture to network: downsample 48kHz linear PCM and compress
/// to mu-law.
#[derive(Debug, Default)]
pub struct OutboundPath {
    downsampler: Downsampler,
}

impl OutboundPath {
    /// Creates the path with fresh filter state.
    pub fn new() -> Self {
        Self { downsampler: Downsampler::new() }
    }

    /// Transcodes one wide-band block into a mu-law block.
    pub fn process(&mut self, wideband: &[i16]) -> Result<Vec<u8>> {
        if wideband.len() != WIDE_BLOCK {
            return Err(Error::BlockSize { got: wideband.len(), need: WIDE_BLOCK });
        }
        let linear: Vec<f64> = wideband.iter().map(|&s| s as f64).collect();
        let narrow = self.downsampler.process(&linear);
        Ok(narrow.iter().map(|&s| ulaw::encode(clamp_sample(s))).collect())
    }
}

/// Network to hardware playback: expand mu-law and upsample to 48kHz
/// linear PCM.
#[derive(Debug, Default)]
pub struct InboundPath {
    upsampler: Upsampler,
}

impl InboundPath {
    /// Creates the path with fresh filter state.
    pub fn new() -> Self {
        Self { upsampler: Upsampler::new() }
    }

    /// Transcodes one mu-law block into a wide-band block.
    pub fn process(&mut self, mulaw: &[u8]) -> Result<Vec<i16>> {
        if mulaw.len() != NARROW_BLOCK {
            return Err(Error::BlockSize { got: mulaw.len(), need: NARROW_BLOCK });
        }
        let linear: Vec<f64> = mulaw.iter().map(|&b| ulaw::decode(b) as f64).collect();
        let wide = self.upsampler.process(&linear);
        Ok(wide.iter().map(|&s| clamp_sample(s)).collect())
    }
}
