//! Realtime processing core.
//!
//! This module defines the minimal `Effect` trait and a lightweight `Engine<E>`
//! wrapper that owns an effect plus an optional post chain, tracks sample rate
//! and elapsed time, and processes one **mono** block at a time with zero heap
//! work on the audio thread.
//!
//! Design goals
//! - No dynamic allocations in the audio thread
//! - SR changes handled lazily (if the host reconfigures), with cheap branching
//! - Generic over the effect type, so hosts avoid trait objects

use crate::chain::Chain;

/// Anything that turns one input sample into one output sample.
pub trait Effect {
    /// Called when the engine is (re)initialized or when the sample rate changes.
    fn reset(&mut self, sr: f32);

    /// Called once before each block; the place to pick up parameter changes.
    fn begin_block(&mut self) {}

    /// Process the next mono sample. Implementations should assume the sample
    /// rate has been communicated via `reset`.
    fn process(&mut self, input: f32) -> f32;
}

/// Lightweight realtime engine that owns an effect and its post chain.
pub struct Engine<E: Effect> {
    sr: f32,
    frames: u64,
    effect: E,
    chain: Chain,
}

impl<E: Effect> Engine<E> {
    /// Construct with an already-configured effect. We immediately `reset`
    /// it to communicate the sample rate.
    #[inline]
    pub fn new(mut effect: E, sr: f32) -> Self {
        let sr = sr.max(1.0);
        effect.reset(sr);
        Self { sr, frames: 0, effect, chain: Chain::default() }
    }

    /// Attach a post chain (built off the audio thread).
    pub fn with_chain(mut self, mut chain: Chain) -> Self {
        chain.reset(self.sr);
        self.chain = chain;
        self
    }

    /// Process one block.
    ///
    /// - `None` input (host delivered nothing) writes silence and leaves all state untouched.
    /// - Mismatched lengths process the common prefix and zero the rest of `output`.
    ///
    /// Returns the number of samples actually processed.
    pub fn process_block(&mut self, input: Option<&[f32]>, output: &mut [f32]) -> usize {
        let Some(input) = input else {
            output.fill(0.0);
            return 0;
        };
        let n = input.len().min(output.len());

        self.effect.begin_block();
        for (o, &x) in output[..n].iter_mut().zip(&input[..n]) {
            *o = self.effect.process(x);
        }
        output[n..].fill(0.0);
        self.chain.apply(&mut output[..n]);

        self.frames += n as u64;
        n
    }

    /// Communicate a (possibly) new host sample rate; resets only on change.
    #[inline]
    pub fn set_sample_rate(&mut self, sr: f32) {
        if sr != self.sr && sr > 0.0 {
            self.reset(sr);
        }
    }

    /// Clear all effect and chain state and adopt `sr`.
    pub fn reset(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        self.effect.reset(self.sr);
        self.chain.reset(self.sr);
    }

    /// Return the engine’s current sample rate.
    #[inline] pub fn sample_rate(&self) -> f32 { self.sr }

    /// Elapsed processed time in seconds.
    #[inline] pub fn time(&self) -> f64 { self.frames as f64 / self.sr as f64 }

    #[inline] pub fn frames_processed(&self) -> u64 { self.frames }

    #[inline] pub fn effect(&self) -> &E { &self.effect }

    /// Mutable access for tests and offline hosts.
    #[inline] pub fn effect_mut(&mut self) -> &mut E { &mut self.effect }

    #[inline] pub fn chain_mut(&mut self) -> &mut Chain { &mut self.chain }
}
