//! Self-frequency rejection.
//!
//! Two cooperating guards keep the effect from chasing its own output:
//! - spectral: bins near recently synthesized frequencies are attenuated
//!   (not zeroed) before peak picking, via [`FrequencyHistory`]
//! - time domain: the output remembered for each ring slot is partially
//!   subtracted from the next output at that slot, via [`FeedbackCanceller`]

use dissonor_core::spectrum::{reject_near, REJECTION_FACTOR};

/// Number of synthesized frequencies remembered.
pub const HISTORY_LEN: usize = 5;
/// Fraction of the previous output at a slot subtracted from the new one.
pub const FEEDBACK_CANCEL_RATIO: f32 = 0.6;

/// Bounded FIFO of recently synthesized frequencies; the oldest entry is evicted.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FrequencyHistory {
    buf: [f32; HISTORY_LEN],
    head: usize, // next write position
    len: usize,
}

impl FrequencyHistory {
    #[inline] pub fn new() -> Self { Self::default() }
    #[inline] pub fn len(&self) -> usize { self.len }
    #[inline] pub fn is_empty(&self) -> bool { self.len == 0 }

    pub fn push(&mut self, freq_hz: f32) {
        self.buf[self.head] = freq_hz;
        self.head = (self.head + 1) % HISTORY_LEN;
        self.len = (self.len + 1).min(HISTORY_LEN);
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.head = 0;
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f32> + Clone + '_ {
        let start = (self.head + HISTORY_LEN - self.len) % HISTORY_LEN;
        (0..self.len).map(move |k| self.buf[(start + k) % HISTORY_LEN])
    }

    /// Attenuate bins within `bandwidth_hz` of any entry by [`REJECTION_FACTOR`].
    pub fn attenuate(&self, mags: &mut [f32], bin_hz: f32, bandwidth_hz: f32) {
        if self.is_empty() {
            return;
        }
        reject_near(mags, bin_hz, self.iter(), bandwidth_hz, REJECTION_FACTOR);
    }
}

/// Time-domain cancellation against the output previously emitted at the same slot.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FeedbackCanceller {
    ratio: f32,
}

impl Default for FeedbackCanceller {
    fn default() -> Self {
        Self { ratio: FEEDBACK_CANCEL_RATIO }
    }
}

impl FeedbackCanceller {
    #[inline] pub fn ratio(&self) -> f32 { self.ratio }

    /// `out = sample - previous * ratio`; `previous` is overwritten with `out`.
    #[inline]
    pub fn cancel(&self, previous: &mut f32, sample: f32) -> f32 {
        let out = sample - *previous * self.ratio;
        *previous = out;
        out
    }
}
