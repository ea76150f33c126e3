//! Small per-sample building blocks for the post chain.
//!
//! These are zero-allocation components designed for realtime use.
//! Everything here is `Copy` and cheap to move; no locks, no heap.
//!
//! Contents:
//! - `Lfo`             : sine low-frequency oscillator for modulation
//! - `OnePoleSmoother` : parameter smoothing
//! - `OnePoleLp`       : gentle low-pass used for echo damping
//!
//! Notes:
//! - Frequency is **Hz**; methods expect the current **sample rate** when stepping.

use dissonor_core::dsp::{fast_sin, kill_denormals, one_pole_coeff_hz, one_pole_coeff_ms, wrap_phase, TAU};

/// Sine LFO with phase in radians.
#[derive(Copy, Clone, Debug, Default)]
pub struct Lfo {
    phase: f32,
    rate: f32, // Hz
}

impl Lfo {
    #[inline] pub fn sine(rate_hz: f32) -> Self { Self { phase: 0.0, rate: rate_hz.max(0.0) } }
    #[inline] pub fn set_rate(&mut self, hz: f32) { self.rate = hz.max(0.0); }
    #[inline] pub fn rate(&self) -> f32 { self.rate }
    #[inline] pub fn reset(&mut self) { self.phase = 0.0; }

    /// Next LFO value in **[-1,1]**.
    #[inline]
    pub fn next_norm(&mut self, sr: f32) -> f32 {
        let s = fast_sin(self.phase);
        self.phase = wrap_phase(self.phase + TAU * self.rate / sr);
        s
    }
}

/// One-pole parameter smoother: y += (x - y) * (1 - a), with `a = exp(-1/(tau*sr))`.
#[derive(Copy, Clone, Debug)]
pub struct OnePoleSmoother {
    a: f32, // alpha (closer to 1 → slower)
    y: f32,
}
impl OnePoleSmoother {
    #[inline] pub fn new_ms(t_ms: f32, sr: f32) -> Self { Self { a: one_pole_coeff_ms(t_ms, sr), y: 0.0 } }
    #[inline] pub fn reset(&mut self, y0: f32) { self.y = y0; }
    #[inline] pub fn set_time_ms(&mut self, t_ms: f32, sr: f32) { self.a = one_pole_coeff_ms(t_ms, sr); }
    #[inline] pub fn process(&mut self, x: f32) -> f32 { self.y += (x - self.y) * (1.0 - self.a); self.y }
    #[inline] pub fn value(&self) -> f32 { self.y }
}

/// One-pole low-pass `y += a * (x - y)` with `a = 1 - exp(-2π fc / sr)`.
#[derive(Copy, Clone, Debug)]
pub struct OnePoleLp {
    a: f32,
    y: f32,
    fc: f32,
}
impl OnePoleLp {
    #[inline]
    pub fn new(cut_hz: f32, sr: f32) -> Self {
        let mut s = Self { a: 0.0, y: 0.0, fc: cut_hz.max(0.0) };
        s.set_cutoff_hz(cut_hz, sr);
        s
    }

    #[inline]
    pub fn set_cutoff_hz(&mut self, cut_hz: f32, sr: f32) {
        self.fc = cut_hz.max(0.0);
        self.a = 1.0 - one_pole_coeff_hz(self.fc, sr.max(1.0));
    }

    #[inline] pub fn cutoff_hz(&self) -> f32 { self.fc }
    #[inline] pub fn clear(&mut self) { self.y = 0.0; }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.y += self.a * (x - self.y);
        self.y = kill_denormals(self.y);
        self.y
    }
}
