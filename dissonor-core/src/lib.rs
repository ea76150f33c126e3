#![cfg_attr(not(feature = "std"), no_std)]
//! Dissonor Core: no_std-ready spectral DSP primitives with optional fast-math and SIMD hooks.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` (+ `alloc`) and use `libm`/`micromath` math backends
//! - `fast-math`: polynomial sine for the oscillator hot path
//! - `simd`     : eight-lane window multiply via `wide`
//!
//! Modules
//! - [`dsp`]      : math backend, phase wrapping, smoothing coefficients
//! - [`fft`]      : precomputed iterative radix-2 FFT (forward + inverse)
//! - [`window`]   : Hann window table
//! - [`spectrum`] : magnitudes and self-frequency rejection
//! - [`envelope`] : cos² high-frequency rolloff, envelope following
//! - [`peaks`]    : top-K peak picking with parabolic refinement
//!
//! Design
//! - Heap use only at construction (FFT tables, window); processing is allocation free
//! - Pure functions where possible so every stage is testable in isolation

extern crate alloc;

pub mod dsp;
pub mod envelope;
pub mod fft;
pub mod peaks;
pub mod spectrum;
pub mod window;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{fast_sin, kill_denormals, lerp, wrap_phase, TAU};
    pub use crate::envelope::{follow, Rolloff, ROLLOFF_END_HZ, ROLLOFF_START_HZ};
    pub use crate::fft::{FftError, Radix2Fft};
    pub use crate::peaks::{PeakDetector, PeakList, SpectralPeak, MAX_PEAKS};
    pub use crate::spectrum::{bin_hz, magnitudes, reject_near, REJECTION_FACTOR};
    pub use crate::window::{hann, HannWindow};
}

#[cfg(test)]
mod smoke {

    #[test]
    fn prelude_exists() {
        use crate::prelude::*;
        let fft = Radix2Fft::new(64).unwrap();
        let win = HannWindow::new(fft.size());
        assert_eq!(win.len(), 64);
        assert_eq!(Rolloff::default().gain(100.0), 1.0);
        assert!(PeakList::new().is_empty());
    }
}
