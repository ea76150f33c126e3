//! Iterative radix-2 Cooley-Tukey FFT.
//!
//! The plan (`Radix2Fft`) precomputes the bit-reversal permutation and the
//! twiddle table once; `forward`/`inverse` then run in place over split
//! real/imaginary slices without touching the heap. Sizes must be powers of two.
//!
//! Sign convention: forward uses `e^{-i 2π k n / N}` (same as most FFT libraries),
//! inverse uses `e^{+i ...}` and scales by `1/N`, so `inverse(forward(x)) == x`.

use alloc::vec::Vec;

use crate::dsp::{m_cos, m_sin, TAU};

/// Errors produced by the transform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FftError {
    #[error("fft size must be a power of two >= 2, got {0}")]
    NotPowerOfTwo(usize),
    #[error("fft buffers have length re={re}, im={im}; plan expects {expected}")]
    LengthMismatch { expected: usize, re: usize, im: usize },
}

/// Precomputed radix-2 plan for one transform size.
#[derive(Clone, Debug)]
pub struct Radix2Fft {
    size: usize,
    // twiddle k = exp(-i 2π k / N), k in 0..N/2
    tw_re: Vec<f32>,
    tw_im: Vec<f32>,
    bitrev: Vec<u32>,
}

impl Radix2Fft {
    pub fn new(size: usize) -> Result<Self, FftError> {
        if size < 2 || !size.is_power_of_two() {
            return Err(FftError::NotPowerOfTwo(size));
        }
        let bits = size.trailing_zeros();
        let half = size / 2;

        let mut tw_re = Vec::with_capacity(half);
        let mut tw_im = Vec::with_capacity(half);
        for k in 0..half {
            let angle = TAU * k as f32 / size as f32;
            tw_re.push(m_cos(angle));
            tw_im.push(-m_sin(angle));
        }

        let bitrev = (0..size).map(|i| reverse_bits(i as u32, bits)).collect();

        Ok(Self { size, tw_re, tw_im, bitrev })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// In-place forward transform.
    pub fn forward(&self, re: &mut [f32], im: &mut [f32]) -> Result<(), FftError> {
        self.check(re, im)?;
        self.permute(re, im);
        self.butterflies(re, im, false);
        Ok(())
    }

    /// In-place inverse transform, scaled by `1/N`.
    pub fn inverse(&self, re: &mut [f32], im: &mut [f32]) -> Result<(), FftError> {
        self.check(re, im)?;
        self.permute(re, im);
        self.butterflies(re, im, true);
        let scale = 1.0 / self.size as f32;
        for (r, i) in re.iter_mut().zip(im.iter_mut()) {
            *r *= scale;
            *i *= scale;
        }
        Ok(())
    }

    #[inline]
    fn check(&self, re: &[f32], im: &[f32]) -> Result<(), FftError> {
        if re.len() != self.size || im.len() != self.size {
            return Err(FftError::LengthMismatch { expected: self.size, re: re.len(), im: im.len() });
        }
        Ok(())
    }

    fn permute(&self, re: &mut [f32], im: &mut [f32]) {
        for (i, &j) in self.bitrev.iter().enumerate() {
            let j = j as usize;
            if j > i {
                re.swap(i, j);
                im.swap(i, j);
            }
        }
    }

    fn butterflies(&self, re: &mut [f32], im: &mut [f32], inverse: bool) {
        let n = self.size;
        let mut span = 2;
        while span <= n {
            let half = span / 2;
            let step = n / span;
            for start in (0..n).step_by(span) {
                for k in 0..half {
                    let wr = self.tw_re[k * step];
                    let wi = if inverse { -self.tw_im[k * step] } else { self.tw_im[k * step] };

                    let j = start + k;
                    let l = j + half;
                    let tr = re[l] * wr - im[l] * wi;
                    let ti = re[l] * wi + im[l] * wr;

                    re[l] = re[j] - tr;
                    im[l] = im[j] - ti;
                    re[j] += tr;
                    im[j] += ti;
                }
            }
            span <<= 1;
        }
    }
}

#[inline]
fn reverse_bits(mut x: u32, bits: u32) -> u32 {
    let mut y = 0;
    for _ in 0..bits {
        y = (y << 1) | (x & 1);
        x >>= 1;
    }
    y
}

// ------------------------------------ Tests --------------------------------------
