//! Magnitude spectrum helpers and spectral self-rejection.

use crate::dsp::{m_abs, m_sqrt};

/// Factor applied to bins near a recently synthesized frequency (-20 dB).
pub const REJECTION_FACTOR: f32 = 0.1;

/// Width of one bin in Hz.
#[inline]
pub fn bin_hz(sample_rate: f32, size: usize) -> f32 {
    sample_rate / size as f32
}

/// `out[i] = sqrt(re[i]² + im[i]²)` for `i < out.len()`.
pub fn magnitudes(re: &[f32], im: &[f32], out: &mut [f32]) {
    for ((m, &r), &i) in out.iter_mut().zip(re).zip(im) {
        *m = m_sqrt(r * r + i * i);
    }
}

/// Scale every bin whose centre lies strictly within `bandwidth_hz` of any of
/// `recent` by `factor`.
///
/// A bin matching several entries is still scaled once, so repeated entries in
/// the history do not push a genuinely recurring tone below detection.
pub fn reject_near<I>(mags: &mut [f32], bin_hz: f32, recent: I, bandwidth_hz: f32, factor: f32)
where
    I: IntoIterator<Item = f32>,
    I::IntoIter: Clone,
{
    let recent = recent.into_iter();
    for (i, m) in mags.iter_mut().enumerate() {
        let f = i as f32 * bin_hz;
        if recent.clone().any(|r| m_abs(f - r) < bandwidth_hz) {
            *m *= factor;
        }
    }
}

/// Largest value in the slice (0 for an empty slice).
#[inline]
pub fn max_magnitude(mags: &[f32]) -> f32 {
    mags.iter().copied().fold(0.0, f32::max)
}

#[inline]
pub fn all_finite(mags: &[f32]) -> bool {
    mags.iter().all(|m| m.is_finite())
}
