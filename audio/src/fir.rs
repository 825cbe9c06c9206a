//! Kaiser-window lowpass FIR design and stateful block filtering.
//!
//! The resampling paths share one filter design: an odd-length symmetric
//! lowpass with its corner just under the narrow-band Nyquist limit. Blocks
//! are filtered through a persistent delay line so consecutive blocks join
//! without discontinuities.

use std::f64::consts::PI;

/// Filter length used by both resampling directions.
pub const LOWPASS_TAPS: usize = 31;

/// Corner frequency of the shared lowpass design, in Hz at the wide-band
/// rate. Chosen empirically to match the network-side filter response.
pub const LOWPASS_CUTOFF_HZ: f64 = 4300.0;

/// Kaiser window shape parameter for the shared design.
pub const LOWPASS_BETA: f64 = 3.0;

/// Zeroth-order modified Bessel function of the first kind, by power
/// series. Converges quickly for the beta values used here.
fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut sum = 1.0;
    let mut term = 1.0;
    for k in 1..=32 {
        let f = half / k as f64;
        term *= f * f;
        sum += term;
        if term < sum * 1e-14 {
            break;
        }
    }
    sum
}

fn kaiser(n: usize, taps: usize, beta: f64) -> f64 {
    let m = (taps - 1) as f64;
    let r = 2.0 * n as f64 / m - 1.0;
    bessel_i0(beta * (1.0 - r * r).max(0.0).sqrt()) / bessel_i0(beta)
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Designs a windowed-sinc lowpass filter.
///
/// `cutoff` is the corner frequency as a fraction of the Nyquist rate
/// (0..1). The result is normalized to unit DC gain.
pub fn design_lowpass(taps: usize, cutoff: f64, beta: f64) -> Vec<f64> {
    let mid = (taps - 1) as f64 / 2.0;
    let mut h: Vec<f64> = (0..taps)
        .map(|n| {
            let x = n as f64 - mid;
            cutoff * sinc(cutoff * x) * kaiser(n, taps, beta)
        })
        .collect();
    let sum: f64 = h.iter().sum();
    for v in h.iter_mut() {
        *v /= sum;
    }
    h
}

/// An FIR filter applied block-at-a-time with persistent state.
///
/// The delay line (transposed direct-form II) carries across calls, so
/// splitting an input stream into blocks yields the same output as
/// filtering it whole. State is set up once at construction and must not
/// be reinitialized mid-stream.
#[derive(Debug, Clone)]
pub struct FirFilter {
    taps: Vec<f64>,
    state: Vec<f64>,
}

impl FirFilter {
    /// Creates a filter with the given coefficients and a zeroed delay
    /// line (silence steady state).
    pub fn new(taps: Vec<f64>) -> Self {
        assert!(!taps.is_empty(), "filter needs at least one tap");
        let state = vec![0.0; taps.len() - 1];
        Self { taps, state }
    }

    /// Creates the shared narrow-band lowpass used for resampling.
    pub fn narrowband_lowpass(sample_rate: f64) -> Self {
        let cutoff = LOWPASS_CUTOFF_HZ / (sample_rate / 2.0);
        Self::new(design_lowpass(LOWPASS_TAPS, cutoff, LOWPASS_BETA))
    }

    /// Returns the filter coefficients.
    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    /// Filters one block, updating the delay line in place.
    pub fn process(&mut self, input: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(input.len());
        let n = self.state.len();
        for &x in input {
            if n == 0 {
                out.push(self.taps[0] * x);
                continue;
            }
            let y = self.taps[0] * x + self.state[0];
            for k in 0..n - 1 {
                self.state[k] = self.taps[k + 1] * x + self.state[k + 1];
            }
            self.state[n - 1] = self.taps[n] * x;
            out.push(y);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_design_symmetric_unit_dc() {
        let h = design_lowpass(LOWPASS_TAPS, LOWPASS_CUTOFF_HZ / 24000.0, LOWPASS_BETA);
        assert_eq!(h.len(), LOWPASS_TAPS);
        // Linear phase requires symmetry.
        for i in 0..h.len() / 2 {
            assert!((h[i] - h[h.len() - 1 - i]).abs() < 1e-12);
        }
        // Unit DC gain.
        let sum: f64 = h.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        // Center tap dominates.
        let center = h[h.len() / 2];
        assert!(h.iter().all(|&v| v <= center));
    }

    #[test]
    fn test_passband_and_stopband() {
        let filter = FirFilter::narrowband_lowpass(48000.0);
        let gain_at = |freq_hz: f64| {
            // Steady-state amplitude after the transient has settled.
            let mut f = filter.clone();
            let n = 4800;
            let input: Vec<f64> = (0..n)
                .map(|i| (2.0 * PI * freq_hz * i as f64 / 48000.0).sin())
                .collect();
            let out = f.process(&input);
            out[n / 2..]
                .iter()
                .fold(0.0f64, |acc, &v| acc.max(v.abs()))
        };
        // 300Hz is well inside the passband, 12kHz well inside the stopband.
        assert!(gain_at(300.0) > 0.95);
        assert!(gain_at(12_000.0) < 0.05);
    }

    #[test]
    fn test_state_carries_across_blocks() {
        let taps = design_lowpass(LOWPASS_TAPS, 0.18, LOWPASS_BETA);
        let input: Vec<f64> = (0..512).map(|i| ((i * 37) % 101) as f64 - 50.0).collect();

        let mut whole = FirFilter::new(taps.clone());
        let expected = whole.process(&input);

        let mut split = FirFilter::new(taps);
        let mut got = split.process(&input[..100]);
        got.extend(split.process(&input[100..317]));
        got.extend(split.process(&input[317..]));

        assert_eq!(got.len(), expected.len());
        for (a, b) in got.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_impulse_response_is_taps() {
        let taps = vec![0.25, 0.5, 0.25];
        let mut f = FirFilter::new(taps.clone());
        let mut impulse = vec![0.0; 8];
        impulse[0] = 1.0;
        let out = f.process(&impulse);
        assert_eq!(&out[..3], taps.as_slice());
        assert!(out[3..].iter().all(|&v| v == 0.0));
    }
}
