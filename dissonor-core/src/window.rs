//! Hann analysis window.
//!
//! The table is computed once per frame size; `apply` multiplies a frame into a
//! caller-owned destination (the real part of the FFT input). With the `simd`
//! feature the multiply runs eight lanes at a time via `wide`.

use alloc::vec::Vec;

use crate::dsp::{m_cos, TAU};

/// Hann coefficient `0.5 * (1 - cos(2π i / (size - 1)))`.
#[inline]
pub fn hann(index: usize, size: usize) -> f32 {
    if size < 2 {
        return 1.0;
    }
    0.5 * (1.0 - m_cos(TAU * index as f32 / (size as f32 - 1.0)))
}

#[derive(Clone, Debug)]
pub struct HannWindow {
    coeffs: Vec<f32>,
}

impl HannWindow {
    pub fn new(size: usize) -> Self {
        Self { coeffs: (0..size).map(|i| hann(i, size)).collect() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    #[inline]
    pub fn coeffs(&self) -> &[f32] {
        &self.coeffs
    }

    /// `dst[i] = src[i] * w[i]` over the common length.
    pub fn apply(&self, src: &[f32], dst: &mut [f32]) {
        let n = self.coeffs.len().min(src.len()).min(dst.len());
        let done = self.apply_wide(&src[..n], &mut dst[..n]);
        for i in done..n {
            dst[i] = src[i] * self.coeffs[i];
        }
    }

    #[cfg(feature = "simd")]
    fn apply_wide(&self, src: &[f32], dst: &mut [f32]) -> usize {
        use wide::f32x8;

        let lanes = src.len() / 8 * 8;
        for o in (0..lanes).step_by(8) {
            let mut s = [0.0f32; 8];
            let mut w = [0.0f32; 8];
            s.copy_from_slice(&src[o..o + 8]);
            w.copy_from_slice(&self.coeffs[o..o + 8]);
            let y = f32x8::from(s) * f32x8::from(w);
            dst[o..o + 8].copy_from_slice(&y.to_array());
        }
        lanes
    }

    #[cfg(not(feature = "simd"))]
    #[inline]
    fn apply_wide(&self, _src: &[f32], _dst: &mut [f32]) -> usize {
        0
    }
}
