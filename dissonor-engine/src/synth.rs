//! Dissonance synthesizer: a fixed bank of sine oscillators retargeted once per frame.
//!
//! Slot `k` follows the `k`-th strongest peak at `peak * dissonanceFactor + freqShift`
//! with weight `0.5 / (k + 1)` scaled by the rolloff gain at that frequency.
//! Slots without a peak fall silent but keep their phase, so a slot that comes
//! back later resumes without a discontinuity.

use dissonor_core::dsp::{fast_sin, wrap_phase, TAU};
use dissonor_core::envelope::Rolloff;
use dissonor_core::peaks::{PeakList, MAX_PEAKS};

use crate::params::ParamSnapshot;

pub const SLOT_COUNT: usize = MAX_PEAKS;

/// Target frequency for a detected peak.
#[inline]
pub fn dissonant_frequency(peak_hz: f32, params: &ParamSnapshot) -> f32 {
    peak_hz * params.dissonance_factor + params.freq_shift
}

/// Base weight of slot `k` before rolloff.
#[inline]
pub fn slot_weight(k: usize) -> f32 {
    0.5 / (k as f32 + 1.0)
}

#[derive(Copy, Clone, Debug, Default)]
struct Slot {
    source_hz: f32, // detected peak this slot follows
    freq: f32,      // synthesized frequency
    phase: f32,     // radians in [0, 2π)
    step: f32,      // radians per sample
    weight: f32,
    active: bool,
}

#[derive(Clone, Debug)]
pub struct DissonanceSynth {
    slots: [Slot; SLOT_COUNT],
    sr: f32,
    rolloff: Rolloff,
}

impl DissonanceSynth {
    pub fn new(sr: f32) -> Self {
        Self { slots: [Slot::default(); SLOT_COUNT], sr: sr.max(1.0), rolloff: Rolloff::default() }
    }

    pub fn with_rolloff(mut self, rolloff: Rolloff) -> Self {
        self.rolloff = rolloff;
        self
    }

    /// New sample rate; phases are kept, increments recomputed.
    pub fn set_sample_rate(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        for s in &mut self.slots {
            s.step = TAU * s.freq / self.sr;
        }
    }

    /// Silence every slot and zero the phases.
    pub fn reset(&mut self) {
        self.slots = [Slot::default(); SLOT_COUNT];
    }

    /// Point slot `k` at peak `k`; slots beyond the peak count go inactive.
    pub fn retune(&mut self, peaks: &PeakList, params: &ParamSnapshot) {
        for (k, slot) in self.slots.iter_mut().enumerate() {
            match peaks.as_slice().get(k) {
                Some(p) => {
                    slot.source_hz = p.frequency;
                    slot.active = true;
                }
                None => slot.active = false,
            }
        }
        self.apply_params(params);
    }

    /// Recompute frequencies and weights of active slots for new parameter values.
    /// Returns `true` if any active slot moved to a different frequency.
    pub fn apply_params(&mut self, params: &ParamSnapshot) -> bool {
        let mut moved = false;
        for (k, slot) in self.slots.iter_mut().enumerate() {
            if !slot.active {
                continue;
            }
            let freq = dissonant_frequency(slot.source_hz, params);
            moved |= freq != slot.freq;
            slot.freq = freq;
            slot.step = TAU * freq / self.sr;
            slot.weight = slot_weight(k) * self.rolloff.gain(freq);
        }
        moved
    }

    /// Next synthesized sample: weighted sum of active oscillators.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let mut acc = 0.0;
        for s in self.slots.iter_mut().filter(|s| s.active) {
            s.phase = wrap_phase(s.phase + s.step);
            acc += fast_sin(s.phase) * s.weight;
        }
        acc
    }

    /// Frequencies currently being synthesized, in slot order.
    pub fn active_frequencies(&self) -> impl Iterator<Item = f32> + '_ {
        self.slots.iter().filter(|s| s.active).map(|s| s.freq)
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    /// Frequency of slot `k` if it is active.
    pub fn slot_frequency(&self, k: usize) -> Option<f32> {
        self.slots.get(k).filter(|s| s.active).map(|s| s.freq)
    }

    pub fn slot_weight(&self, k: usize) -> Option<f32> {
        self.slots.get(k).filter(|s| s.active).map(|s| s.weight)
    }

    pub fn phases(&self) -> [f32; SLOT_COUNT] {
        self.slots.map(|s| s.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dissonor_core::peaks::SpectralPeak;

    const SR: f32 = 48_000.0;

    fn peaks(freqs: &[f32]) -> PeakList {
        let mut list = PeakList::new();
        for (i, &f) in freqs.iter().enumerate() {
            list.insert_ranked(SpectralPeak { frequency: f, magnitude: 10.0 - i as f32 }, MAX_PEAKS);
        }
        list
    }

    fn params(factor: f32, shift: f32) -> ParamSnapshot {
        ParamSnapshot { dissonance_factor: factor, freq_shift: shift, ..ParamSnapshot::default() }
    }

    #[test]
    fn silent_without_peaks() {
        let mut s = DissonanceSynth::new(SR);
        s.retune(&PeakList::new(), &ParamSnapshot::default());
        assert_eq!(s.active_count(), 0);
        assert!((0..256).all(|_| s.next() == 0.0));
    }

    #[test]
    fn target_frequency_and_weights() {
        let mut s = DissonanceSynth::new(SR);
        s.retune(&peaks(&[440.0, 660.0, 1000.0]), &params(1.2, 100.0));
        assert!((s.slot_frequency(0).unwrap() - 628.0).abs() < 1e-3);
        assert!((s.slot_frequency(1).unwrap() - 892.0).abs() < 1e-3);
        assert!((s.slot_frequency(2).unwrap() - 1300.0).abs() < 1e-3);
        assert_eq!(s.slot_weight(0), Some(0.5));
        assert_eq!(s.slot_weight(1), Some(0.25));
        assert!((s.slot_weight(2).unwrap() - 0.5 / 3.0).abs() < 1e-7);
    }

    #[test]
    fn weight_follows_rolloff() {
        let mut s = DissonanceSynth::new(SR);
        // 1800 * 2 + 500 = 4100 Hz, inside the rolloff band
        s.retune(&peaks(&[1800.0]), &params(2.0, 500.0));
        let w = s.slot_weight(0).unwrap();
        assert!(w > 0.0 && w < 0.5, "w={w}");
        assert!((w - 0.5 * Rolloff::default().gain(4100.0)).abs() < 1e-7);
    }

    #[test]
    fn output_bounded_by_weight_sum() {
        let mut s = DissonanceSynth::new(SR);
        s.retune(&peaks(&[200.0, 300.0, 450.0]), &params(1.0, 0.0));
        let bound = 0.5 + 0.25 + 0.5 / 3.0 + 1e-3;
        for _ in 0..48_000 {
            assert!(s.next().abs() <= bound);
        }
    }

    #[test]
    fn phases_stay_wrapped() {
        let mut s = DissonanceSynth::new(SR);
        s.retune(&peaks(&[1999.0, 1500.0, 20.5]), &params(2.0, 500.0));
        for _ in 0..200_000 {
            s.next();
            for p in s.phases() {
                assert!((0.0..TAU).contains(&p), "phase {p}");
            }
        }
    }

    #[test]
    fn inactive_slot_keeps_phase() {
        let mut s = DissonanceSynth::new(SR);
        let p = params(1.2, 0.0);
        s.retune(&peaks(&[400.0, 800.0]), &p);
        for _ in 0..100 {
            s.next();
        }
        let frozen = s.phases()[1];
        s.retune(&peaks(&[400.0]), &p);
        for _ in 0..100 {
            s.next();
        }
        assert_eq!(s.phases()[1], frozen);
        assert_eq!(s.slot_frequency(1), None);
        assert_eq!(s.active_frequencies().count(), 1);
    }

    #[test]
    fn live_parameter_change_retargets() {
        let mut s = DissonanceSynth::new(SR);
        s.retune(&peaks(&[500.0]), &params(1.2, 0.0));
        assert!((s.slot_frequency(0).unwrap() - 600.0).abs() < 1e-3);
        assert!(!s.apply_params(&params(1.2, 0.0)));
        assert!(s.apply_params(&params(1.5, 50.0)));
        assert!((s.slot_frequency(0).unwrap() - 800.0).abs() < 1e-3);
    }

    #[test]
    fn first_sample_is_one_step_in() {
        let mut s = DissonanceSynth::new(SR);
        s.retune(&peaks(&[1000.0]), &params(1.0, 0.0));
        let step = TAU * 1000.0 / SR;
        let y = s.next();
        assert!((y - 0.5 * step.sin()).abs() < 2e-3);
    }
}
