//! Amplitude and frequency shaping applied to the synthesized signal.
//!
//! - `Rolloff` : smooth cos² high-frequency attenuation between two corner frequencies
//! - `follow`  : envelope following (synth sample × |input| × volume)
//!
//! The rolloff is used twice by the engine: on the analysis magnitude spectrum
//! and on the per-oscillator weights when oscillators are re-targeted.

use core::f32::consts::FRAC_PI_2;

use crate::dsp::{m_abs, m_cos};

/// Rolloff corner where attenuation starts (gain 1 at and below).
pub const ROLLOFF_START_HZ: f32 = 3000.0;
/// Rolloff corner where content is fully removed (gain 0 at and above).
pub const ROLLOFF_END_HZ: f32 = 5000.0;

/// cos² high-frequency rolloff.
///
/// `gain(f)` is exactly 1 for `f <= start`, exactly 0 for `f >= end`, and
/// `cos²(π/2 · (f - start) / (end - start))` in between, which has zero slope at
/// `start` and meets zero with zero slope at `end`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rolloff {
    start: f32,
    end: f32,
}

impl Default for Rolloff {
    fn default() -> Self {
        Self::new(ROLLOFF_START_HZ, ROLLOFF_END_HZ)
    }
}

impl Rolloff {
    /// `end` below `start` collapses to a hard cutoff at `start`.
    #[inline]
    pub fn new(start_hz: f32, end_hz: f32) -> Self {
        let start = start_hz.max(0.0);
        Self { start, end: end_hz.max(start) }
    }

    #[inline] pub fn start_hz(&self) -> f32 { self.start }
    #[inline] pub fn end_hz(&self) -> f32 { self.end }

    #[inline]
    pub fn gain(&self, freq_hz: f32) -> f32 {
        let f = m_abs(freq_hz);
        if f <= self.start {
            1.0
        } else if f >= self.end {
            0.0
        } else {
            let ratio = (f - self.start) / (self.end - self.start);
            let c = m_cos(ratio * FRAC_PI_2);
            c * c
        }
    }

    /// Scale a magnitude spectrum in place; bin `i` sits at `i * bin_hz`.
    pub fn apply(&self, mags: &mut [f32], bin_hz: f32) {
        for (i, m) in mags.iter_mut().enumerate() {
            *m *= self.gain(i as f32 * bin_hz);
        }
    }
}

/// Envelope following: give `synth` the loudness contour of `input`, then scale by `volume`.
#[inline]
pub fn follow(synth: f32, input: f32, volume: f32) -> f32 {
    synth * m_abs(input) * volume
}

// ------------------------------------ Tests --------------------------------------
