//! The dissonance effect: listens to its input, finds the strongest partials,
//! and plays a detuned, input-following copy of them back.
//!
//! Per sample, in order:
//! 1. store `input * inputGain` in the frame at the shared index
//! 2. pull the next synthesized sample
//! 3. follow the input envelope: `synth * |stored input| * outputVolume`
//! 4. subtract `0.6 *` the output previously emitted at this index, remember the result
//! 5. advance the index; on wrap, analyze the frame and retarget the oscillators
//!
//! Parameters are sampled once per block in `begin_block`. Nothing here
//! allocates or logs after construction.

use std::sync::Arc;

use dissonor_core::envelope::follow;
use dissonor_core::fft::FftError;
use dissonor_core::peaks::PeakList;

use crate::analyzer::SpectralAnalyzer;
use crate::config::EngineConfig;
use crate::frame::FrameRing;
use crate::graph::Effect;
use crate::params::{ParamSnapshot, Params};
use crate::rejection::{FeedbackCanceller, FrequencyHistory};
use crate::report::ReportSender;
use crate::synth::DissonanceSynth;

pub struct Dissonor {
    params: Arc<Params>,
    snapshot: ParamSnapshot,
    ring: FrameRing,
    analyzer: SpectralAnalyzer,
    history: FrequencyHistory,
    canceller: FeedbackCanceller,
    synth: DissonanceSynth,
    reports: Option<ReportSender>,
    last_peaks: PeakList,
    faults: u64,
}

impl Dissonor {
    /// Allocates every buffer the effect will ever use.
    pub fn new(config: &EngineConfig, params: Arc<Params>) -> Result<Self, FftError> {
        let analyzer = SpectralAnalyzer::new(config.sample_rate, config.frame_size)?;
        log::debug!(
            "dissonor: sr={} frame={} ({:.1} ms, {:.2} Hz/bin)",
            config.sample_rate,
            config.frame_size,
            1000.0 * config.frame_size as f32 / config.sample_rate,
            analyzer.bin_hz()
        );
        let snapshot = params.snapshot();
        Ok(Self {
            params,
            snapshot,
            ring: FrameRing::new(config.frame_size),
            synth: DissonanceSynth::new(config.sample_rate).with_rolloff(*analyzer.rolloff()),
            analyzer,
            history: FrequencyHistory::new(),
            canceller: FeedbackCanceller::default(),
            reports: None,
            last_peaks: PeakList::new(),
            faults: 0,
        })
    }

    /// Publish one report per completed frame through `tx`.
    pub fn with_reports(mut self, tx: ReportSender) -> Self {
        self.reports = Some(tx);
        self
    }

    #[inline] pub fn params(&self) -> &Arc<Params> { &self.params }
    #[inline] pub fn frame(&self) -> &FrameRing { &self.ring }
    #[inline] pub fn analyzer(&self) -> &SpectralAnalyzer { &self.analyzer }
    #[inline] pub fn synth(&self) -> &DissonanceSynth { &self.synth }
    #[inline] pub fn history(&self) -> &FrequencyHistory { &self.history }
    #[inline] pub fn history_mut(&mut self) -> &mut FrequencyHistory { &mut self.history }

    /// Peaks found in the most recent frame.
    #[inline] pub fn last_peaks(&self) -> &PeakList { &self.last_peaks }

    /// Frames whose analysis faulted since construction.
    #[inline] pub fn fault_count(&self) -> u64 { self.faults }

    /// Every frequency the synth starts playing goes into the rejection history.
    fn remember_active(&mut self) {
        for f in self.synth.active_frequencies() {
            self.history.push(f);
        }
    }

    fn on_frame_complete(&mut self) {
        let (peaks, fault) =
            match self.analyzer.analyze(self.ring.frame(), &self.history, self.snapshot.rejection_bandwidth) {
                Ok(peaks) => (peaks, None),
                Err(e) => {
                    self.faults += 1;
                    (PeakList::new(), Some(e))
                }
            };

        self.synth.retune(&peaks, &self.snapshot);
        self.remember_active();
        self.last_peaks = peaks;

        if let Some(tx) = self.reports.as_mut() {
            tx.publish(peaks, fault, self.ring.peak_level());
        }
    }
}

impl Effect for Dissonor {
    /// Clears all signal state and the frame and fault counters. Report
    /// generations keep counting up across resets so a consumer never sees
    /// one repeat.
    fn reset(&mut self, sr: f32) {
        self.analyzer.set_sample_rate(sr);
        self.synth.set_sample_rate(sr);
        self.synth.reset();
        self.ring.clear();
        self.history.clear();
        self.last_peaks.clear();
        self.faults = 0;
    }

    fn begin_block(&mut self) {
        self.snapshot = self.params.snapshot();
        if self.synth.apply_params(&self.snapshot) {
            self.remember_active();
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        // non-finite input is treated as silence so it cannot poison the ring
        let x = if input.is_finite() { input } else { 0.0 };
        let stored = self.ring.write(x * self.snapshot.input_gain);
        let shaped = follow(self.synth.next(), stored, self.snapshot.output_volume);
        let out = self.canceller.cancel(self.ring.previous_output_mut(), shaped);
        if self.ring.advance() {
            self.on_frame_complete();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Engine;
    use crate::params::ParamId;
    use crate::report::{report_channel, ReportReceiver};
    use dissonor_core::dsp::TAU;

    const SR: f32 = 48_000.0;
    const N: usize = 2048;
    const BLOCK: usize = 256;

    fn setup() -> (Engine<Dissonor>, Arc<Params>, ReportReceiver) {
        let params = Arc::new(Params::new());
        let (tx, rx) = report_channel(16);
        let cfg = EngineConfig::new(SR, N).unwrap();
        let fx = Dissonor::new(&cfg, Arc::clone(&params)).unwrap().with_reports(tx);
        (Engine::new(fx, SR), params, rx)
    }

    fn sine(hz: f32, amp: f32, start: usize, len: usize) -> Vec<f32> {
        (start..start + len).map(|i| amp * (TAU * hz * i as f32 / SR).sin()).collect()
    }

    /// Feed `frames` whole frames of a sine in blocks; returns all output.
    fn run_sine(eng: &mut Engine<Dissonor>, hz: f32, amp: f32, frames: usize) -> Vec<f32> {
        let total = frames * N;
        let mut out = vec![0.0; total];
        let mut pos = 0;
        while pos < total {
            let input = sine(hz, amp, pos, BLOCK);
            eng.process_block(Some(&input), &mut out[pos..pos + BLOCK]);
            pos += BLOCK;
        }
        out
    }

    #[test]
    fn silent_frame_reports_nothing_and_outputs_zero() {
        let (mut eng, _p, mut rx) = setup();
        let input = vec![0.0; N];
        let mut out = vec![1.0; N];
        eng.process_block(Some(&input), &mut out);
        assert!(out.iter().all(|&s| s == 0.0));
        let r = rx.try_recv().unwrap();
        assert_eq!(r.generation, 1);
        assert!(r.peaks.is_empty());
        assert!(r.fault.is_none());
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn tracks_440_at_factor_1_2() {
        let (mut eng, params, mut rx) = setup();
        params.set(ParamId::FreqShift, 0.0);
        params.set(ParamId::DissonanceFactor, 1.2);
        run_sine(&mut eng, 440.0, 0.5, 1);

        let r = rx.try_recv().unwrap();
        assert_eq!(r.peaks.len(), 1);
        let bin = SR / N as f32;
        assert!((r.peaks.as_slice()[0].frequency - 440.0).abs() < bin);

        let f0 = eng.effect().synth().slot_frequency(0).unwrap();
        assert!((f0 - 528.0).abs() < 1.2 * bin, "slot 0 at {f0}");
        assert_eq!(eng.effect().history().iter().collect::<Vec<_>>(), vec![f0]);
    }

    #[test]
    fn output_appears_only_after_first_frame() {
        let (mut eng, params, _rx) = setup();
        params.set(ParamId::FreqShift, 0.0);
        let out = run_sine(&mut eng, 440.0, 0.5, 2);
        assert!(out[..N].iter().all(|&s| s == 0.0));
        assert!(out[N..].iter().any(|&s| s.abs() > 1e-3));
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn self_frequency_is_damped() {
        // 530 Hz sits within the default 20 Hz bandwidth of a remembered 528 Hz
        let (mut clean, _p1, mut rx_clean) = setup();
        run_sine(&mut clean, 530.0, 0.5, 1);
        let undamped = rx_clean.try_recv().unwrap().peaks.as_slice()[0].magnitude;

        let (mut eng, _p2, mut rx) = setup();
        eng.effect_mut().history_mut().push(528.0);
        run_sine(&mut eng, 530.0, 0.5, 1);
        let damped = rx.try_recv().unwrap().peaks.as_slice().first().map_or(0.0, |p| p.magnitude);
        assert!(damped < 0.5 * undamped, "{damped} vs {undamped}");

        for bin in [22, 23] {
            let ratio = eng.effect().analyzer().magnitudes()[bin] / clean.effect().analyzer().magnitudes()[bin];
            assert!((ratio - 0.1).abs() < 1e-4, "bin {bin}: {ratio}");
        }
    }

    #[test]
    fn missing_input_leaves_state_untouched() {
        let (mut eng, _p, _rx) = setup();
        let input = sine(440.0, 0.5, 0, 100);
        let mut out = vec![0.0; 100];
        eng.process_block(Some(&input), &mut out);
        let idx = eng.effect().frame().index();

        let mut silent = vec![1.0; BLOCK];
        eng.process_block(None, &mut silent);
        assert!(silent.iter().all(|&s| s == 0.0));
        assert_eq!(eng.effect().frame().index(), idx);

        eng.process_block(Some(&input), &mut out);
        assert_eq!(eng.effect().frame().index(), idx + 100);
    }

    #[test]
    fn input_gain_scales_the_frame() {
        let (mut eng, params, _rx) = setup();
        params.set(ParamId::InputGain, 2.0);
        let mut out = [0.0; 4];
        eng.process_block(Some(&[0.25, -0.25, 0.5, 0.0]), &mut out);
        assert_eq!(&eng.effect().frame().frame()[..4], &[0.5, -0.5, 1.0, 0.0]);
    }

    #[test]
    fn parameter_changes_apply_at_block_start() {
        let (mut eng, params, _rx) = setup();
        params.set(ParamId::FreqShift, 0.0);
        run_sine(&mut eng, 440.0, 0.5, 1);
        let before = eng.effect().synth().slot_frequency(0).unwrap();

        params.set(ParamId::FreqShift, 200.0);
        assert_eq!(eng.effect().synth().slot_frequency(0), Some(before));
        let mut out = vec![0.0; BLOCK];
        eng.process_block(Some(&sine(440.0, 0.5, N, BLOCK)), &mut out);
        let after = eng.effect().synth().slot_frequency(0).unwrap();
        assert!((after - before - 200.0).abs() < 1e-2, "{before} -> {after}");
    }

    #[test]
    fn retargeted_frequency_enters_history() {
        let (mut eng, params, _rx) = setup();
        params.set(ParamId::FreqShift, 0.0);
        run_sine(&mut eng, 440.0, 0.5, 1);
        assert_eq!(eng.effect().history().len(), 1);

        params.set(ParamId::FreqShift, 300.0);
        let input = sine(440.0, 0.5, N, BLOCK);
        let mut out = vec![0.0; BLOCK];
        eng.process_block(Some(&input), &mut out);
        let playing = eng.effect().synth().slot_frequency(0).unwrap();
        let history: Vec<f32> = eng.effect().history().iter().collect();
        assert_eq!(history.len(), 2);
        assert_eq!(history.last().copied(), Some(playing));

        // unchanged parameters add nothing
        eng.process_block(Some(&sine(440.0, 0.5, N + BLOCK, BLOCK)), &mut out);
        assert_eq!(eng.effect().history().len(), 2);
    }

    #[test]
    fn non_finite_input_is_silenced() {
        let (mut eng, _p, mut rx) = setup();
        let mut input = vec![0.0; N];
        input[5] = f32::NAN;
        input[6] = f32::INFINITY;
        let mut out = vec![0.0; N];
        eng.process_block(Some(&input), &mut out);
        assert!(out.iter().all(|s| s.is_finite()));
        let r = rx.try_recv().unwrap();
        assert!(r.fault.is_none());
        assert!(r.peaks.is_empty());
        assert_eq!(eng.effect().fault_count(), 0);
    }

    #[test]
    fn loud_noise_stays_bounded() {
        use rand::{Rng, SeedableRng};

        let (mut eng, params, mut rx) = setup();
        params.set(ParamId::InputGain, 5.0);
        params.set(ParamId::OutputVolume, 1.0);
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut out = vec![0.0; BLOCK];
        for _ in 0..(6 * N / BLOCK) {
            let input: Vec<f32> = (0..BLOCK).map(|_| rng.gen_range(-1.0..1.0)).collect();
            eng.process_block(Some(&input), &mut out);
            assert!(out.iter().all(|s| s.is_finite() && s.abs() < 50.0));
        }
        assert_eq!(std::iter::from_fn(|| rx.try_recv()).count(), 6);
        assert_eq!(eng.effect().fault_count(), 0);
    }

    #[test]
    fn one_report_per_frame() {
        let (mut eng, _p, mut rx) = setup();
        run_sine(&mut eng, 300.0, 0.3, 3);
        let gens: Vec<u64> = std::iter::from_fn(|| rx.try_recv()).map(|r| r.generation).collect();
        assert_eq!(gens, vec![1, 2, 3]);
        assert_eq!(eng.effect().frame().frames_completed(), 3);
    }

    #[test]
    fn reset_clears_everything() {
        let (mut eng, _p, mut rx) = setup();
        run_sine(&mut eng, 440.0, 0.5, 1);
        assert!(!eng.effect().history().is_empty());
        eng.set_sample_rate(44_100.0);
        let fx = eng.effect();
        assert!(fx.history().is_empty());
        assert_eq!(fx.synth().active_count(), 0);
        assert_eq!(fx.frame().index(), 0);
        assert_eq!(fx.frame().frames_completed(), 0);
        assert_eq!(fx.fault_count(), 0);
        assert_eq!(fx.analyzer().sample_rate(), 44_100.0);

        // generations continue across the reset
        run_sine(&mut eng, 440.0, 0.5, 1);
        let gens: Vec<u64> = std::iter::from_fn(|| rx.try_recv()).map(|r| r.generation).collect();
        assert_eq!(gens, vec![1, 2]);
        assert_eq!(rx.missed(), 0);
        assert_eq!(eng.effect().frame().frames_completed(), 1);
    }
}
