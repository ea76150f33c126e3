//! Modulated feedback echo.
//!
//! Structure
//! - One heap delay line sized for `MAX_DELAY_S` at construction (never resized on the audio thread).
//! - Fractional read via linear interpolation so the LFO can sweep the delay time smoothly.
//! - One-pole low-pass in the wet path; its output is also what is fed back.
//! - `time == 0` bypasses the stage entirely (dry passthrough).

use dissonor_core::dsp::{kill_denormals, lerp};

use crate::chain::ChainError;
use crate::nodes::{Lfo, OnePoleLp};

/// Longest supported delay time, seconds.
pub const MAX_DELAY_S: f32 = 2.0;
pub const MAX_FEEDBACK: f32 = 0.9;
pub const MAX_MOD_RATE_HZ: f32 = 10.0;
pub const MAX_MOD_DEPTH_S: f32 = 0.02;

/// Circular buffer with a fractional tap.
#[derive(Clone, Debug)]
pub struct DelayLine {
    buf: Vec<f32>,
    write: usize,
}

impl DelayLine {
    /// Holds up to `max_samples` of history.
    pub fn new(max_samples: usize) -> Self {
        Self { buf: vec![0.0; max_samples.max(1) + 2], write: 0 }
    }

    /// Longest delay readable, samples.
    #[inline] pub fn capacity(&self) -> usize { self.buf.len() - 2 }

    #[inline]
    pub fn clear(&mut self) {
        self.buf.fill(0.0);
        self.write = 0;
    }

    /// Sample written `delay` samples ago (clamped to `[1, capacity]`).
    #[inline]
    pub fn read(&self, delay: f32) -> f32 {
        let len = self.buf.len();
        let d = delay.clamp(1.0, self.capacity() as f32);
        let whole = d as usize;
        let frac = d - whole as f32;
        let a = self.buf[(self.write + len - whole) % len];
        let b = self.buf[(self.write + len - whole - 1) % len];
        lerp(a, b, frac)
    }

    #[inline]
    pub fn write(&mut self, x: f32) {
        self.buf[self.write] = x;
        self.write += 1;
        if self.write == self.buf.len() {
            self.write = 0;
        }
    }
}

/// Feedback echo with damping and delay-time modulation.
#[derive(Clone, Debug)]
pub struct Echo {
    sr: f32,
    line: DelayLine,
    damping: OnePoleLp,
    lfo: Lfo,
    time: f32,      // s, 0 = bypass
    feedback: f32,  // 0..0.9
    mix: f32,       // wet fraction
    mod_depth: f32, // s
}

impl Echo {
    pub fn new(sr: f32) -> Self {
        let sr = sr.max(1.0);
        Self {
            sr,
            line: DelayLine::new((MAX_DELAY_S * sr).ceil() as usize),
            damping: OnePoleLp::new(2000.0, sr),
            lfo: Lfo::sine(0.0),
            time: 0.0,
            feedback: 0.4,
            mix: 0.5,
            mod_depth: 0.0,
        }
    }

    #[inline] pub fn time(&self) -> f32 { self.time }
    #[inline] pub fn feedback(&self) -> f32 { self.feedback }
    #[inline] pub fn mix(&self) -> f32 { self.mix }
    #[inline] pub fn damping_hz(&self) -> f32 { self.damping.cutoff_hz() }
    #[inline] pub fn mod_rate(&self) -> f32 { self.lfo.rate() }
    #[inline] pub fn mod_depth(&self) -> f32 { self.mod_depth }

    /// Apply a sample-rate change. Reallocates only when the rate grows past capacity.
    pub fn reset(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        let needed = (MAX_DELAY_S * self.sr).ceil() as usize;
        if needed > self.line.capacity() {
            self.line = DelayLine::new(needed);
        } else {
            self.line.clear();
        }
        self.damping.set_cutoff_hz(self.damping.cutoff_hz(), self.sr);
        self.damping.clear();
        self.lfo.reset();
    }

    /// Current value of a parameter by name.
    pub fn parameter(&self, name: &str) -> Result<f32, ChainError> {
        match name {
            "time" | "delay" => Ok(self.time),
            "feedback" => Ok(self.feedback),
            "mix" | "wet_dry" => Ok(self.mix),
            "damping" | "filter" => Ok(self.damping_hz()),
            "mod_rate" => Ok(self.mod_rate()),
            "mod_depth" => Ok(self.mod_depth),
            _ => Err(ChainError::UnknownParameter { stage: "echo", name: name.to_string() }),
        }
    }

    /// Set a parameter by name; values are clamped and non-finite values
    /// leave the parameter unchanged. Returns the stored value.
    pub fn set_parameter(&mut self, name: &str, value: f32) -> Result<f32, ChainError> {
        if !value.is_finite() {
            return self.parameter(name);
        }
        let v = match name {
            "time" | "delay" => {
                self.time = value.clamp(0.0, MAX_DELAY_S);
                self.time
            }
            "feedback" => {
                self.feedback = value.clamp(0.0, MAX_FEEDBACK);
                self.feedback
            }
            "mix" | "wet_dry" => {
                self.mix = value.clamp(0.0, 1.0);
                self.mix
            }
            "damping" | "filter" => {
                self.damping.set_cutoff_hz(value.clamp(20.0, 20_000.0), self.sr);
                self.damping.cutoff_hz()
            }
            "mod_rate" => {
                self.lfo.set_rate(value.clamp(0.0, MAX_MOD_RATE_HZ));
                self.lfo.rate()
            }
            "mod_depth" => {
                self.mod_depth = value.clamp(0.0, MAX_MOD_DEPTH_S);
                self.mod_depth
            }
            _ => return Err(ChainError::UnknownParameter { stage: "echo", name: name.to_string() }),
        };
        Ok(v)
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        if self.time <= 0.0 {
            return x;
        }
        let modulation = self.lfo.next_norm(self.sr) * self.mod_depth;
        let delay = (self.time + modulation) * self.sr;
        let wet = self.damping.process(self.line.read(delay));
        self.line.write(kill_denormals(x + wet * self.feedback));
        (1.0 - self.mix) * x + self.mix * wet
    }

    pub fn apply(&mut self, buf: &mut [f32]) {
        if self.time <= 0.0 {
            return;
        }
        for s in buf.iter_mut() {
            *s = self.process(*s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn delay_line_integer_and_fractional_taps() {
        let mut d = DelayLine::new(16);
        for i in 1..=8 {
            d.write(i as f32);
        }
        // last written is 8: one sample ago
        assert_eq!(d.read(1.0), 8.0);
        assert_eq!(d.read(3.0), 6.0);
        assert!((d.read(2.5) - 6.5).abs() < 1e-6);
        // requests beyond capacity clamp
        assert_eq!(d.read(1000.0), d.read(16.0));
    }

    #[test]
    fn non_finite_values_are_ignored() {
        let mut e = Echo::new(SR);
        e.set_parameter("time", 0.05).unwrap();
        assert_eq!(e.set_parameter("time", f32::NAN), Ok(0.05));
        assert_eq!(e.set_parameter("feedback", f32::INFINITY), Ok(e.feedback()));
        assert_eq!(e.set_parameter("damping", f32::NAN), Ok(e.damping_hz()));
        assert!(e.damping_hz().is_finite());
        assert!(matches!(e.set_parameter("warp", f32::NAN), Err(ChainError::UnknownParameter { .. })));

        let mut buf = vec![0.5; 4800];
        e.apply(&mut buf);
        assert!(buf.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn default_echo_is_bypass() {
        let mut e = Echo::new(SR);
        let mut buf = [0.1, -0.3, 0.7];
        e.apply(&mut buf);
        assert_eq!(buf, [0.1, -0.3, 0.7]);
    }

    #[test]
    fn impulse_comes_back_after_delay() {
        let mut e = Echo::new(SR);
        e.set_parameter("time", 0.01).unwrap();
        e.set_parameter("mix", 1.0).unwrap();
        e.set_parameter("feedback", 0.0).unwrap();
        e.set_parameter("damping", 20_000.0).unwrap();
        let delay = (0.01 * SR) as usize;
        let mut buf = vec![0.0; delay * 2];
        buf[0] = 1.0;
        e.apply(&mut buf);
        let (argmax, _) = buf
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |(bi, bv), (i, &v)| if v.abs() > bv { (i, v.abs()) } else { (bi, bv) });
        assert!((argmax as i64 - delay as i64).abs() <= 2, "argmax={argmax}");
        assert_eq!(buf[0], 0.0);
    }

    #[test]
    fn feedback_repeats_decay() {
        let mut e = Echo::new(SR);
        e.set_parameter("time", 0.005).unwrap();
        e.set_parameter("feedback", 0.5).unwrap();
        e.set_parameter("mix", 1.0).unwrap();
        let d = (0.005 * SR) as usize;
        let mut buf = vec![0.0; d * 4 + 8];
        buf[0] = 1.0;
        e.apply(&mut buf);
        let energy = |k: usize| buf[k * d - 4..k * d + 8].iter().map(|v| v * v).sum::<f32>();
        assert!(energy(1) > energy(2));
        assert!(energy(2) > energy(3));
        assert!(energy(3) > 0.0);
    }

    #[test]
    fn parameters_clamp_and_reject_unknown() {
        let mut e = Echo::new(SR);
        assert_eq!(e.set_parameter("time", 5.0), Ok(MAX_DELAY_S));
        assert_eq!(e.set_parameter("feedback", 1.5), Ok(MAX_FEEDBACK));
        assert_eq!(e.set_parameter("wet_dry", -1.0), Ok(0.0));
        assert_eq!(e.set_parameter("filter", 5.0), Ok(20.0));
        assert_eq!(e.set_parameter("mod_rate", 50.0), Ok(MAX_MOD_RATE_HZ));
        assert_eq!(e.set_parameter("mod_depth", 1.0), Ok(MAX_MOD_DEPTH_S));
        assert_eq!(
            e.set_parameter("room", 0.5),
            Err(ChainError::UnknownParameter { stage: "echo", name: "room".into() })
        );
    }

    #[test]
    fn modulated_echo_stays_finite() {
        let mut e = Echo::new(SR);
        for (k, v) in [("time", 0.05), ("feedback", 0.9), ("mod_rate", 10.0), ("mod_depth", 0.02)] {
            e.set_parameter(k, v).unwrap();
        }
        let mut buf: Vec<f32> = (0..SR as usize).map(|i| if i % 1000 == 0 { 1.0 } else { 0.0 }).collect();
        e.apply(&mut buf);
        assert!(buf.iter().all(|v| v.is_finite() && v.abs() < 20.0));
    }
}
