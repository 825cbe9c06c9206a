//! Fixed-ratio resampling between the narrow-band and wide-band rates.
//!
//! Both directions share the lowpass design from [`crate::fir`] but own
//! independent filter instances: each direction's delay line persists
//! across every block it processes and is never reset between blocks.

use crate::fir::FirFilter;

/// Wide-band (hardware) sample rate.
pub const WIDEBAND_RATE: f64 = 48_000.0;

/// Narrow-band (network) sample rate.
pub const NARROWBAND_RATE: f64 = 8_000.0;

/// Ratio between the two rates.
pub const RATIO: usize = 6;

/// Wide-band to narrow-band reduction: lowpass first, then keep every
/// sixth sample.
#[derive(Debug)]
pub struct Downsampler {
    filter: FirFilter,
}

impl Downsampler {
    /// Creates a downsampler with a fresh (zeroed) delay line.
    pub fn new() -> Self {
        Self { filter: FirFilter::narrowband_lowpass(WIDEBAND_RATE) }
    }

    /// Reduces one wide-band block. Output length is input length / 6.
    pub fn process(&mut self, wideband: &[f64]) -> Vec<f64> {
        let filtered = self.filter.process(wideband);
        filtered.iter().step_by(RATIO).copied().collect()
    }
}

impl Default for Downsampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Narrow-band to wide-band expansion: repeat each sample six times, then
/// lowpass away the imaging artifacts.
#[derive(Debug)]
pub struct Upsampler {
    filter: FirFilter,
}

impl Upsampler {
    /// Creates an upsampler with a fresh (zeroed) delay line.
    pub fn new() -> Self {
        Self { filter: FirFilter::narrowband_lowpass(WIDEBAND_RATE) }
    }

    /// Expands one narrow-band block. Output length is input length * 6.
    pub fn process(&mut self, narrowband: &[f64]) -> Vec<f64> {
        let mut expanded = Vec::with_capacity(narrowband.len() * RATIO);
        for &s in narrowband {
            for _ in 0..RATIO {
                expanded.push(s);
            }
        }
        self.filter.process(&expanded)
    }
}

impl Default for Upsampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_lengths() {
        let mut down = Downsampler::new();
        assert_eq!(down.process(&[0.0; 960]).len(), 160);
        let mut up = Upsampler::new();
        assert_eq!(up.process(&[0.0; 160]).len(), 960);
    }

    #[test]
    fn test_silence_stays_silent() {
        let mut down = Downsampler::new();
        let mut up = Upsampler::new();
        for _ in 0..3 {
            assert!(down.process(&[0.0; 960]).iter().all(|&v| v == 0.0));
            assert!(up.process(&[0.0; 160]).iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_dc_preserved() {
        // A constant signal passes both directions at unit gain once the
        // filter transient settles.
        let mut down = Downsampler::new();
        let mut last = Vec::new();
        for _ in 0..4 {
            last = down.process(&[1000.0; 960]);
        }
        for &v in &last {
            assert!((v - 1000.0).abs() < 1.0, "got {v}");
        }

        let mut up = Upsampler::new();
        for _ in 0..4 {
            last = up.process(&[1000.0; 160]);
        }
        for &v in &last {
            assert!((v - 1000.0).abs() < 1.0, "got {v}");
        }
    }

    #[test]
    fn test_downsample_continuity_across_blocks() {
        // Feeding one long block or six short ones must agree exactly,
        // because the delay line persists.
        let signal: Vec<f64> = (0..1920)
            .map(|i| (i as f64 * 0.013).sin() * 8000.0)
            .collect();

        let mut whole = Downsampler::new();
        let expected = whole.process(&signal);

        let mut split = Downsampler::new();
        let mut got = split.process(&signal[..960]);
        got.extend(split.process(&signal[960..]));

        assert_eq!(got.len(), expected.len());
        for (a, b) in got.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
