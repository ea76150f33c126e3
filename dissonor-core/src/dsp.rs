//! Generic DSP utilities and math helpers.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Optional `fast-math` approximations for the oscillator hot path
//! - Clean, side-effect free helpers that are easy to test
//!
//! Features used by this file:
//! - `fast-math` : enables a polynomial sine for per-sample synthesis
//!
//! Conventions:
//! - All functions are `#[inline]` where useful to help the optimizer.
//! - Phases are in **radians**; the canonical range is `[0, 2π)`.

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // micromath preferred if explicitly requested (works in no_std)
    if #[cfg(feature = "micromath")] {
        use micromath::F32Ext as _;
        #[inline] pub(crate) fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] pub(crate) fn m_cos(x: f32) -> f32 { x.cos() }
        #[inline] pub(crate) fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] pub(crate) fn m_sqrt(x: f32) -> f32 { x.sqrt() }
        #[inline] pub(crate) fn m_floor(x: f32) -> f32 { x.floor() }
        #[inline] pub(crate) fn m_abs(x: f32) -> f32 { x.abs() }
    // libm (C math) in no_std
    } else if #[cfg(feature = "no-std")] {
        #[inline] pub(crate) fn m_sin(x: f32) -> f32 { libm::sinf(x) }
        #[inline] pub(crate) fn m_cos(x: f32) -> f32 { libm::cosf(x) }
        #[inline] pub(crate) fn m_exp(x: f32) -> f32 { libm::expf(x) }
        #[inline] pub(crate) fn m_sqrt(x: f32) -> f32 { libm::sqrtf(x) }
        #[inline] pub(crate) fn m_floor(x: f32) -> f32 { libm::floorf(x) }
        #[inline] pub(crate) fn m_abs(x: f32) -> f32 { libm::fabsf(x) }
    // std backend
    } else {
        #[inline] pub(crate) fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] pub(crate) fn m_cos(x: f32) -> f32 { x.cos() }
        #[inline] pub(crate) fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] pub(crate) fn m_sqrt(x: f32) -> f32 { x.sqrt() }
        #[inline] pub(crate) fn m_floor(x: f32) -> f32 { x.floor() }
        #[inline] pub(crate) fn m_abs(x: f32) -> f32 { x.abs() }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π (commonly useful)
pub const TAU: f32 = 2.0 * PI;

/// A very small epsilon used in denormal handling and safe divisions.
pub const EPS_SMALL: f32 = 1.0e-20;

// --------------------------------- Utilities -------------------------------------

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Wrap a phase in radians into `[0, 2π)`.
///
/// Uses the remainder (not truncation of the accumulated value), so a phase that
/// runs for hours keeps its fractional position.
#[inline]
pub fn wrap_phase(p: f32) -> f32 {
    let mut r = p % TAU;
    if r < 0.0 {
        r += TAU;
    }
    // `r + TAU` can round up to exactly TAU for tiny negative inputs.
    if r >= TAU { 0.0 } else { r }
}

/// Kill denormal/subnormal values. Returns 0.0 if |x| < EPS_SMALL.
#[inline]
pub fn kill_denormals(x: f32) -> f32 {
    if m_abs(x) < EPS_SMALL { 0.0 } else { x }
}

// --------------------------------- Fast trig -------------------------------------

/// Fast sine with range reduction into [-π, π] and 5th-order minimax-style poly.
/// Max abs error ~1e-3 for musical uses when `fast-math` is enabled; falls back to exact otherwise.
#[inline]
pub fn fast_sin(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            let mut xr = x;
            let k = m_floor(xr / TAU + 0.5);
            xr -= k * TAU;

            // 5th-order odd polynomial: sin(x) ≈ x * (a + b x^2 + c x^4)
            let x2 = xr * xr;
            xr * (0.999_979_313_3 + x2 * (-0.166_624_432_0 + x2 * 0.008_308_978_98))
        } else {
            m_sin(x)
        }
    }
}

// --------------------------------- Exponentials / smoothing ----------------------

/// One-pole smoothing coefficient for a time constant `t_ms` (milliseconds).
///
/// The discrete one-pole form: `y[n] += (1 - a) * (x[n] - y[n])`
/// where `a = exp(-1/(tau * sr))`.
#[inline]
pub fn one_pole_coeff_ms(t_ms: f32, sr: f32) -> f32 {
    if t_ms <= 0.0 { return 0.0; }
    let tau = t_ms * 0.001;
    m_exp(-1.0 / (tau * sr))
}

/// Convert cutoff in Hz to a simple one-pole (non-TPT) coefficient `exp(-2π fc / sr)`.
#[inline]
pub fn one_pole_coeff_hz(cut_hz: f32, sr: f32) -> f32 {
    let fc = cut_hz.max(0.0).min(0.499 * sr);
    m_exp(-2.0 * PI * fc / sr)
}

// --------------------------------- Tests (std only) ------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_phase_stays_in_range() {
        for p in [-1000.0, -TAU, -1e-9, 0.0, 1.0, TAU, TAU + 1e-6, 12345.678] {
            let w = wrap_phase(p);
            assert!((0.0..TAU).contains(&w), "p={p} w={w}");
        }
    }

    #[test]
    fn wrap_phase_keeps_fraction() {
        let w = wrap_phase(TAU * 3.0 + 0.5);
        assert!((w - 0.5).abs() < 1e-4, "w={w}");
    }

    #[test]
    fn fast_sin_tracks_sin() {
        for i in 0..64 {
            let x = i as f32 * TAU / 64.0;
            assert!((fast_sin(x) - x.sin()).abs() < 2e-3, "x={x}");
        }
    }

    #[test]
    fn smoothing_coeffs_are_unit_interval() {
        let a = one_pole_coeff_ms(10.0, 48000.0);
        assert!(a > 0.0 && a < 1.0);
        let b = one_pole_coeff_hz(1000.0, 48000.0);
        assert!(b > 0.0 && b < 1.0);
        assert_eq!(one_pole_coeff_ms(0.0, 48000.0), 0.0);
    }
}
