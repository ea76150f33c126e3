//! Per-frame spectral analysis: window → FFT → magnitudes → rejection → rolloff → peaks.
//!
//! All scratch buffers are allocated once in [`SpectralAnalyzer::new`]; `analyze`
//! runs on the audio thread at every frame boundary and never allocates.

use dissonor_core::envelope::Rolloff;
use dissonor_core::fft::{FftError, Radix2Fft};
use dissonor_core::peaks::{PeakDetector, PeakList};
use dissonor_core::spectrum::{all_finite, bin_hz, magnitudes};
use dissonor_core::window::HannWindow;

use crate::rejection::FrequencyHistory;

/// Why a frame produced no peaks.
#[derive(Copy, Clone, Debug, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("transform failed: {0}")]
    Transform(#[from] FftError),
    #[error("frame has {got} samples, analyzer expects {expected}")]
    FrameSize { expected: usize, got: usize },
    #[error("spectrum contains non-finite values")]
    NonFinite,
}

#[derive(Clone, Debug)]
pub struct SpectralAnalyzer {
    sample_rate: f32,
    fft: Radix2Fft,
    window: HannWindow,
    detector: PeakDetector,
    rolloff: Rolloff,
    re: Vec<f32>,
    im: Vec<f32>,
    mags: Vec<f32>,
}

impl SpectralAnalyzer {
    /// `frame_size` must be a power of two.
    pub fn new(sample_rate: f32, frame_size: usize) -> Result<Self, FftError> {
        let fft = Radix2Fft::new(frame_size)?;
        Ok(Self {
            sample_rate: sample_rate.max(1.0),
            window: HannWindow::new(frame_size),
            detector: PeakDetector::default(),
            rolloff: Rolloff::default(),
            re: vec![0.0; frame_size],
            im: vec![0.0; frame_size],
            mags: vec![0.0; frame_size / 2],
            fft,
        })
    }

    pub fn with_detector(mut self, detector: PeakDetector) -> Self {
        self.detector = detector;
        self
    }

    #[inline] pub fn frame_size(&self) -> usize { self.fft.size() }
    #[inline] pub fn sample_rate(&self) -> f32 { self.sample_rate }
    #[inline] pub fn bin_hz(&self) -> f32 { bin_hz(self.sample_rate, self.fft.size()) }
    #[inline] pub fn rolloff(&self) -> &Rolloff { &self.rolloff }
    #[inline] pub fn detector(&self) -> &PeakDetector { &self.detector }

    /// Magnitude spectrum of the last analyzed frame after rejection and rolloff.
    #[inline] pub fn magnitudes(&self) -> &[f32] { &self.mags }

    #[inline]
    pub fn set_sample_rate(&mut self, sr: f32) {
        self.sample_rate = sr.max(1.0);
    }

    /// Analyze one complete frame (chronological order, `frame_size` samples).
    ///
    /// Bins within `rejection_bandwidth` Hz of any entry in `history` are
    /// attenuated before the rolloff and peak search.
    pub fn analyze(
        &mut self,
        frame: &[f32],
        history: &FrequencyHistory,
        rejection_bandwidth: f32,
    ) -> Result<PeakList, AnalysisError> {
        let n = self.fft.size();
        if frame.len() != n {
            return Err(AnalysisError::FrameSize { expected: n, got: frame.len() });
        }

        self.window.apply(frame, &mut self.re);
        self.im.fill(0.0);
        self.fft.forward(&mut self.re, &mut self.im)?;
        magnitudes(&self.re, &self.im, &mut self.mags);
        if !all_finite(&self.mags) {
            self.mags.fill(0.0);
            return Err(AnalysisError::NonFinite);
        }

        let bin = self.bin_hz();
        history.attenuate(&mut self.mags, bin, rejection_bandwidth);
        self.rolloff.apply(&mut self.mags, bin);

        Ok(self.detector.detect(&self.mags, self.sample_rate, n))
    }
}
