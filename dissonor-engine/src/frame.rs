//! Analysis frame + previous-output ring sharing one index.
//!
//! Both buffers are the same length and are addressed through the single
//! `index`, so they cannot drift apart: the sample written at slot `j` and the
//! output remembered for slot `j` always refer to the same position in the
//! frame. A frame boundary is crossed exactly when `advance` wraps the index
//! back to zero.

#[derive(Clone, Debug)]
pub struct FrameRing {
    frame: Vec<f32>,
    prev_out: Vec<f32>,
    index: usize,
    completed: u64,
}

impl FrameRing {
    /// Zero-filled ring of `size` slots (`size >= 1`).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self { frame: vec![0.0; size], prev_out: vec![0.0; size], index: 0, completed: 0 }
    }

    #[inline] pub fn len(&self) -> usize { self.frame.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.frame.is_empty() }
    #[inline] pub fn index(&self) -> usize { self.index }

    /// Number of frame boundaries crossed so far.
    #[inline] pub fn frames_completed(&self) -> u64 { self.completed }

    /// Whole analysis frame. In chronological order whenever `index() == 0`.
    #[inline] pub fn frame(&self) -> &[f32] { &self.frame }

    #[inline] pub fn previous_outputs(&self) -> &[f32] { &self.prev_out }

    /// Store an (already gained) input sample at the current slot and return it.
    #[inline]
    pub fn write(&mut self, sample: f32) -> f32 {
        self.frame[self.index] = sample;
        sample
    }

    /// Remembered output for the current slot.
    #[inline]
    pub fn previous_output_mut(&mut self) -> &mut f32 {
        &mut self.prev_out[self.index]
    }

    /// Move both buffers to the next slot. Returns `true` when a frame completed.
    #[inline]
    pub fn advance(&mut self) -> bool {
        self.index += 1;
        if self.index == self.frame.len() {
            self.index = 0;
            self.completed += 1;
            true
        } else {
            false
        }
    }

    /// Largest absolute sample in the frame.
    pub fn peak_level(&self) -> f32 {
        self.frame.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    pub fn clear(&mut self) {
        self.frame.fill(0.0);
        self.prev_out.fill(0.0);
        self.index = 0;
        self.completed = 0;
    }
}
