//! Lock-free parameter store.
//!
//! Each parameter lives in an `AtomicU32` holding the `f32` bit pattern, so a
//! UI/control thread can write while the audio thread reads without locks or
//! allocation. Values are clamped when written; readers can assume validity.
//! The audio thread takes one [`ParamSnapshot`] per block.

use std::sync::atomic::{AtomicU32, Ordering};

/// Identifies one user-adjustable control.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParamId {
    FreqShift,
    DissonanceFactor,
    InputGain,
    OutputVolume,
    RejectionBandwidth,
}

/// Default value and valid range of a parameter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParamRange {
    pub default: f32,
    pub min: f32,
    pub max: f32,
    pub unit: &'static str,
}

impl ParamRange {
    #[inline]
    pub fn clamp(&self, v: f32) -> f32 {
        v.clamp(self.min, self.max)
    }
}

impl ParamId {
    pub const ALL: [ParamId; 5] = [
        ParamId::FreqShift,
        ParamId::DissonanceFactor,
        ParamId::InputGain,
        ParamId::OutputVolume,
        ParamId::RejectionBandwidth,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    /// Canonical (camelCase) name.
    pub const fn name(self) -> &'static str {
        match self {
            ParamId::FreqShift => "freqShift",
            ParamId::DissonanceFactor => "dissonanceFactor",
            ParamId::InputGain => "inputGain",
            ParamId::OutputVolume => "outputVolume",
            ParamId::RejectionBandwidth => "rejectionBandwidth",
        }
    }

    /// Accepts the canonical name as well as snake_case and kebab-case spellings.
    pub fn from_name(name: &str) -> Option<Self> {
        let folded: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::ALL.into_iter().find(|id| id.name().eq_ignore_ascii_case(&folded))
    }

    pub const fn range(self) -> ParamRange {
        match self {
            ParamId::FreqShift => ParamRange { default: 100.0, min: 0.0, max: 500.0, unit: "Hz" },
            ParamId::DissonanceFactor => ParamRange { default: 1.2, min: 1.0, max: 2.0, unit: "ratio" },
            ParamId::InputGain => ParamRange { default: 1.0, min: 0.1, max: 5.0, unit: "x" },
            ParamId::OutputVolume => ParamRange { default: 0.5, min: 0.0, max: 1.0, unit: "x" },
            ParamId::RejectionBandwidth => ParamRange { default: 20.0, min: 5.0, max: 50.0, unit: "Hz" },
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("unknown parameter `{0}`")]
    Unknown(String),
}

/// All parameters as plain floats, read once per block.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParamSnapshot {
    pub freq_shift: f32,
    pub dissonance_factor: f32,
    pub input_gain: f32,
    pub output_volume: f32,
    pub rejection_bandwidth: f32,
}

impl Default for ParamSnapshot {
    fn default() -> Self {
        Self {
            freq_shift: ParamId::FreqShift.range().default,
            dissonance_factor: ParamId::DissonanceFactor.range().default,
            input_gain: ParamId::InputGain.range().default,
            output_volume: ParamId::OutputVolume.range().default,
            rejection_bandwidth: ParamId::RejectionBandwidth.range().default,
        }
    }
}

/// Shared parameter store. Wrap in `Arc` to hand to writer threads.
#[derive(Debug)]
pub struct Params {
    values: [AtomicU32; 5],
}

impl Default for Params {
    fn default() -> Self {
        Self { values: ParamId::ALL.map(|id| AtomicU32::new(id.range().default.to_bits())) }
    }
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    /// Clamp and store. Non-finite values are ignored. Returns the value now held.
    #[inline]
    pub fn set(&self, id: ParamId, value: f32) -> f32 {
        if !value.is_finite() {
            return self.get(id);
        }
        let v = id.range().clamp(value);
        self.values[id.index()].store(v.to_bits(), Ordering::Relaxed);
        v
    }

    pub fn set_by_name(&self, name: &str, value: f32) -> Result<f32, ParamError> {
        let id = ParamId::from_name(name).ok_or_else(|| ParamError::Unknown(name.to_string()))?;
        Ok(self.set(id, value))
    }

    /// Restore every parameter to its default.
    pub fn reset(&self) {
        for id in ParamId::ALL {
            self.set(id, id.range().default);
        }
    }

    #[inline]
    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            freq_shift: self.get(ParamId::FreqShift),
            dissonance_factor: self.get(ParamId::DissonanceFactor),
            input_gain: self.get(ParamId::InputGain),
            output_volume: self.get(ParamId::OutputVolume),
            rejection_bandwidth: self.get(ParamId::RejectionBandwidth),
        }
    }
}
