//! Optional post-processing chain applied to the effect output.
//!
//! Stages are a closed set dispatched through `ChainStage`; the chain is built
//! off the audio thread and only processed in place afterwards. Empty by default.

use crate::delay::Echo;
use crate::nodes::OnePoleSmoother;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChainError {
    #[error("stage `{stage}` has no parameter `{name}`")]
    UnknownParameter { stage: &'static str, name: String },
    #[error("unknown stage kind `{0}`")]
    UnknownStage(String),
}

/// One processing stage.
pub trait Stage {
    fn name(&self) -> &'static str;
    fn reset(&mut self, sr: f32);
    fn apply(&mut self, buf: &mut [f32]);
    /// Set a named parameter (clamped). Returns the value now in effect.
    fn set_parameter(&mut self, name: &str, value: f32) -> Result<f32, ChainError>;
}

pub const MAX_BOOST: f32 = 10.0;
const BOOST_SMOOTH_MS: f32 = 10.0;

/// Smoothed gain stage.
#[derive(Copy, Clone, Debug)]
pub struct Boost {
    sr: f32,
    gain: f32,
    smoother: OnePoleSmoother,
}

impl Boost {
    pub fn new(sr: f32) -> Self {
        let sr = sr.max(1.0);
        let gain = 2.0;
        let mut smoother = OnePoleSmoother::new_ms(BOOST_SMOOTH_MS, sr);
        smoother.reset(gain);
        Self { sr, gain, smoother }
    }

    #[inline] pub fn gain(&self) -> f32 { self.gain }
}

impl Stage for Boost {
    fn name(&self) -> &'static str { "boost" }

    fn reset(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        self.smoother.set_time_ms(BOOST_SMOOTH_MS, self.sr);
        self.smoother.reset(self.gain);
    }

    fn apply(&mut self, buf: &mut [f32]) {
        for s in buf.iter_mut() {
            *s *= self.smoother.process(self.gain);
        }
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> Result<f32, ChainError> {
        match name {
            "gain" | "boost" => {
                if value.is_finite() {
                    self.gain = value.clamp(0.0, MAX_BOOST);
                }
                Ok(self.gain)
            }
            _ => Err(ChainError::UnknownParameter { stage: "boost", name: name.to_string() }),
        }
    }
}

impl Stage for Echo {
    fn name(&self) -> &'static str { "echo" }
    fn reset(&mut self, sr: f32) { Echo::reset(self, sr) }
    fn apply(&mut self, buf: &mut [f32]) { Echo::apply(self, buf) }
    fn set_parameter(&mut self, name: &str, value: f32) -> Result<f32, ChainError> {
        Echo::set_parameter(self, name, value)
    }
}

/// Closed set of stages, so the chain needs no boxing.
#[derive(Clone, Debug)]
pub enum ChainStage {
    Boost(Boost),
    Echo(Echo),
}

impl ChainStage {
    /// Build a stage with defaults from its kind name.
    pub fn from_kind(kind: &str, sr: f32) -> Result<Self, ChainError> {
        match kind {
            "boost" => Ok(ChainStage::Boost(Boost::new(sr))),
            "echo" | "delay" => Ok(ChainStage::Echo(Echo::new(sr))),
            other => Err(ChainError::UnknownStage(other.to_string())),
        }
    }
}

impl Stage for ChainStage {
    fn name(&self) -> &'static str {
        match self {
            ChainStage::Boost(s) => s.name(),
            ChainStage::Echo(s) => Stage::name(s),
        }
    }

    fn reset(&mut self, sr: f32) {
        match self {
            ChainStage::Boost(s) => s.reset(sr),
            ChainStage::Echo(s) => Stage::reset(s, sr),
        }
    }

    fn apply(&mut self, buf: &mut [f32]) {
        match self {
            ChainStage::Boost(s) => s.apply(buf),
            ChainStage::Echo(s) => Stage::apply(s, buf),
        }
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> Result<f32, ChainError> {
        match self {
            ChainStage::Boost(s) => s.set_parameter(name, value),
            ChainStage::Echo(s) => Stage::set_parameter(s, name, value),
        }
    }
}

/// Ordered list of stages.
#[derive(Clone, Debug, Default)]
pub struct Chain {
    stages: Vec<ChainStage>,
}

impl Chain {
    pub fn new(stages: Vec<ChainStage>) -> Self {
        Self { stages }
    }

    #[inline] pub fn len(&self) -> usize { self.stages.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.stages.is_empty() }
    #[inline] pub fn get_mut(&mut self, index: usize) -> Option<&mut ChainStage> { self.stages.get_mut(index) }
    #[inline] pub fn stages(&self) -> &[ChainStage] { &self.stages }

    pub fn reset(&mut self, sr: f32) {
        for s in &mut self.stages {
            s.reset(sr);
        }
    }

    pub fn apply(&mut self, buf: &mut [f32]) {
        for s in &mut self.stages {
            s.apply(buf);
        }
    }

    /// Set a parameter on the first stage named `stage`.
    pub fn set_parameter(&mut self, stage: &str, name: &str, value: f32) -> Result<f32, ChainError> {
        self.stages
            .iter_mut()
            .find(|s| s.name() == stage)
            .ok_or_else(|| ChainError::UnknownStage(stage.to_string()))?
            .set_parameter(name, value)
    }
}
