//! Spectral peak picking with parabolic sub-bin refinement.
//!
//! `PeakDetector::detect` scans a magnitude spectrum for strict local maxima in
//! a frequency band, keeps those above a fraction of the frame's global maximum,
//! refines each by fitting a parabola through the three surrounding bins, and
//! returns the strongest few in a fixed-capacity `PeakList` (no heap).

use crate::dsp::m_floor;
use crate::spectrum::max_magnitude;

/// Capacity of a `PeakList` (and the number of oscillator slots downstream).
pub const MAX_PEAKS: usize = 3;
/// Lower edge of the search band.
pub const MIN_PEAK_HZ: f32 = 20.0;
/// Upper edge of the search band.
pub const MAX_PEAK_HZ: f32 = 2000.0;
/// Candidates must exceed this fraction of the frame's largest magnitude.
pub const PEAK_THRESHOLD_RATIO: f32 = 0.1;

/// One detected peak.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SpectralPeak {
    pub frequency: f32,
    pub magnitude: f32,
}

/// Up to `MAX_PEAKS` peaks ordered by descending magnitude.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PeakList {
    peaks: [SpectralPeak; MAX_PEAKS],
    len: usize,
}

impl PeakList {
    #[inline] pub fn new() -> Self { Self::default() }
    #[inline] pub fn len(&self) -> usize { self.len }
    #[inline] pub fn is_empty(&self) -> bool { self.len == 0 }
    #[inline] pub fn as_slice(&self) -> &[SpectralPeak] { &self.peaks[..self.len] }
    #[inline] pub fn iter(&self) -> core::slice::Iter<'_, SpectralPeak> { self.as_slice().iter() }
    #[inline] pub fn clear(&mut self) { self.len = 0; }

    /// Insert keeping descending magnitude order and at most `limit` entries.
    /// Equal magnitudes keep insertion order.
    pub fn insert_ranked(&mut self, peak: SpectralPeak, limit: usize) {
        let limit = limit.min(MAX_PEAKS);
        let pos = self.as_slice().iter().position(|p| peak.magnitude > p.magnitude).unwrap_or(self.len);
        if pos >= limit {
            return;
        }
        let last = (self.len + 1).min(limit);
        let mut i = last - 1;
        while i > pos {
            self.peaks[i] = self.peaks[i - 1];
            i -= 1;
        }
        self.peaks[pos] = peak;
        self.len = last;
    }
}

impl<'a> IntoIterator for &'a PeakList {
    type Item = &'a SpectralPeak;
    type IntoIter = core::slice::Iter<'a, SpectralPeak>;
    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

/// Offset in bins of the vertex of the parabola through `(-1, α)`, `(0, β)`, `(1, γ)`.
///
/// Returns 0 (the unrefined bin) when the denominator vanishes or the result
/// is not finite.
#[inline]
pub fn parabolic_offset(alpha: f32, beta: f32, gamma: f32) -> f32 {
    let denom = alpha - 2.0 * beta + gamma;
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    let p = 0.5 * (alpha - gamma) / denom;
    if p.is_finite() { p } else { 0.0 }
}

/// Band-limited, thresholded top-K peak picker.
#[derive(Copy, Clone, Debug)]
pub struct PeakDetector {
    min_hz: f32,
    max_hz: f32,
    threshold_ratio: f32,
    max_peaks: usize,
}

impl Default for PeakDetector {
    fn default() -> Self {
        Self {
            min_hz: MIN_PEAK_HZ,
            max_hz: MAX_PEAK_HZ,
            threshold_ratio: PEAK_THRESHOLD_RATIO,
            max_peaks: MAX_PEAKS,
        }
    }
}

impl PeakDetector {
    /// Limit the number of reported peaks (clamped to `1..=MAX_PEAKS`).
    /// `1` gives single dominant-frequency tracking.
    #[inline]
    pub fn with_max_peaks(mut self, k: usize) -> Self {
        self.max_peaks = k.clamp(1, MAX_PEAKS);
        self
    }

    #[inline] pub fn max_peaks(&self) -> usize { self.max_peaks }

    /// `(min_bin, max_bin)` for a transform of `fft_size` at `sample_rate`.
    #[inline]
    pub fn bin_range(&self, sample_rate: f32, fft_size: usize) -> (usize, usize) {
        let n = fft_size as f32;
        let lo = m_floor(self.min_hz * n / sample_rate);
        let hi = m_floor(self.max_hz * n / sample_rate);
        (lo.max(0.0) as usize, hi.max(0.0) as usize)
    }

    /// Detect peaks in `mags` (length `fft_size / 2`).
    pub fn detect(&self, mags: &[f32], sample_rate: f32, fft_size: usize) -> PeakList {
        let mut out = PeakList::new();
        if mags.len() < 3 || fft_size == 0 || sample_rate <= 0.0 {
            return out;
        }

        let (min_bin, max_bin) = self.bin_range(sample_rate, fft_size);
        let lo = (min_bin + 1).max(1);
        let hi = max_bin.saturating_sub(1).min(mags.len() - 1);
        let threshold = max_magnitude(mags) * self.threshold_ratio;
        let bin_hz = sample_rate / fft_size as f32;

        for i in lo..hi {
            let (alpha, beta, gamma) = (mags[i - 1], mags[i], mags[i + 1]);
            if beta > alpha && beta > gamma && beta > threshold {
                let bin = i as f32 + parabolic_offset(alpha, beta, gamma);
                out.insert_ranked(SpectralPeak { frequency: bin * bin_hz, magnitude: beta }, self.max_peaks);
            }
        }
        out
    }
}

// ------------------------------------ Tests --------------------------------------

// needs `Vec`
#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::dsp::TAU;
    use crate::fft::Radix2Fft;
    use crate::spectrum::magnitudes;
    use crate::window::HannWindow;

    const SR: f32 = 48_000.0;
    const N: usize = 2048;

    fn spectrum_of(tones: &[(f32, f32)]) -> Vec<f32> {
        let signal: Vec<f32> = (0..N)
            .map(|i| tones.iter().map(|&(f, a)| a * (TAU * f * i as f32 / SR).sin()).sum())
            .collect();
        let mut re = vec![0.0; N];
        let mut im = vec![0.0; N];
        HannWindow::new(N).apply(&signal, &mut re);
        Radix2Fft::new(N).unwrap().forward(&mut re, &mut im).unwrap();
        let mut mags = vec![0.0; N / 2];
        magnitudes(&re, &im, &mut mags);
        mags
    }

    #[test]
    fn single_sine_gives_one_accurate_peak() {
        let bin = SR / N as f32;
        for f in [110.0, 440.0, 531.7, 1234.5, 1900.0] {
            let peaks = PeakDetector::default().detect(&spectrum_of(&[(f, 1.0)]), SR, N);
            assert_eq!(peaks.len(), 1, "f={f} peaks={peaks:?}");
            let p = peaks.as_slice()[0];
            assert!((p.frequency - f).abs() <= bin, "f={f} got={}", p.frequency);
        }
    }

    #[test]
    fn magnitude_follows_amplitude() {
        let det = PeakDetector::default();
        let quiet = det.detect(&spectrum_of(&[(440.0, 0.25)]), SR, N).as_slice()[0].magnitude;
        let loud = det.detect(&spectrum_of(&[(440.0, 0.75)]), SR, N).as_slice()[0].magnitude;
        assert!(loud > quiet);
        assert!((loud / quiet - 3.0).abs() < 0.01);
    }

    #[test]
    fn several_tones_ordered_by_magnitude() {
        let tones = [(700.0, 0.7), (300.0, 1.0), (1200.0, 0.5)];
        let peaks = PeakDetector::default().detect(&spectrum_of(&tones), SR, N);
        assert_eq!(peaks.len(), 3);
        let s = peaks.as_slice();
        assert!(s[0].magnitude >= s[1].magnitude && s[1].magnitude >= s[2].magnitude);
        let bin = SR / N as f32;
        assert!((s[0].frequency - 300.0).abs() <= bin);
        assert!((s[1].frequency - 700.0).abs() <= bin);
        assert!((s[2].frequency - 1200.0).abs() <= bin);
    }

    #[test]
    fn at_most_three_peaks() {
        let tones = [(200.0, 1.0), (500.0, 0.8), (900.0, 0.6), (1500.0, 0.4)];
        let peaks = PeakDetector::default().detect(&spectrum_of(&tones), SR, N);
        assert_eq!(peaks.len(), 3);
        assert!(peaks.iter().all(|p| (p.frequency - 1500.0).abs() > 100.0));
    }

    #[test]
    fn single_slot_detector_keeps_dominant() {
        let tones = [(300.0, 0.5), (800.0, 1.0)];
        let peaks = PeakDetector::default().with_max_peaks(1).detect(&spectrum_of(&tones), SR, N);
        assert_eq!(peaks.len(), 1);
        assert!((peaks.as_slice()[0].frequency - 800.0).abs() <= SR / N as f32);
    }

    #[test]
    fn silence_has_no_peaks() {
        let mags = vec![0.0; N / 2];
        assert!(PeakDetector::default().detect(&mags, SR, N).is_empty());
    }

    #[test]
    fn tones_outside_band_are_ignored() {
        let peaks = PeakDetector::default().detect(&spectrum_of(&[(3000.0, 1.0)]), SR, N);
        assert!(peaks.is_empty(), "{peaks:?}");
    }

    #[test]
    fn weak_maxima_below_threshold_are_dropped() {
        let mut mags = vec![0.0f32; 64];
        mags[10] = 1.0;
        mags[20] = 0.05;
        let peaks = PeakDetector::default().detect(&mags, 64.0 * 100.0, 128);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks.as_slice()[0].magnitude, 1.0);
    }

    #[test]
    fn parabolic_offset_handles_degenerate_denominator() {
        assert_eq!(parabolic_offset(1.0, 1.0, 1.0), 0.0);
        assert_eq!(parabolic_offset(f32::NAN, 1.0, 0.0), 0.0);
        assert_eq!(parabolic_offset(0.5, 1.0, 0.5), 0.0);
        let p = parabolic_offset(0.2, 1.0, 0.6);
        assert!(p > 0.0 && p < 0.5, "p={p}");
    }

    #[test]
    fn ranked_insert_keeps_order_and_capacity() {
        let mut list = PeakList::new();
        for (f, m) in [(1.0, 0.3), (2.0, 0.9), (3.0, 0.5), (4.0, 0.7), (5.0, 0.9)] {
            list.insert_ranked(SpectralPeak { frequency: f, magnitude: m }, MAX_PEAKS);
        }
        let freqs: Vec<f32> = list.iter().map(|p| p.frequency).collect();
        assert_eq!(freqs, vec![2.0, 5.0, 4.0]);
    }
}
