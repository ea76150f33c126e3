//! Construction-time configuration and the optional TOML file.
//!
//! ```toml
//! [analysis]
//! frame_size = 2048
//!
//! [params]
//! freqShift = 80
//! dissonance_factor = 1.5
//!
//! [[chain]]
//! kind = "echo"
//! time = 0.25
//! feedback = 0.3
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::chain::{Chain, ChainError, ChainStage, Stage};
use crate::params::{ParamId, Params};

pub const DEFAULT_SAMPLE_RATE: f32 = 48_000.0;
pub const DEFAULT_FRAME_SIZE: usize = 2048;
pub const MIN_FRAME_SIZE: usize = 64;
/// Largest frame accepted; keeps the analysis latency under a second at 48 kHz.
pub const MAX_FRAME_SIZE: usize = 32_768;
pub const DEFAULT_CONFIG_FILE: &str = "dissonor.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("frame size {0} must be a power of two in {MIN_FRAME_SIZE}..={MAX_FRAME_SIZE}")]
    FrameSize(usize),
    #[error("sample rate {0} must be positive and finite")]
    SampleRate(f32),
    #[error("unknown parameter `{0}` in [params]")]
    UnknownParam(String),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Values fixed for the lifetime of an effect instance.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    pub frame_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { sample_rate: DEFAULT_SAMPLE_RATE, frame_size: DEFAULT_FRAME_SIZE }
    }
}

impl EngineConfig {
    pub fn new(sample_rate: f32, frame_size: usize) -> Result<Self, ConfigError> {
        let cfg = Self { sample_rate, frame_size };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        if !self.frame_size.is_power_of_two() || !(MIN_FRAME_SIZE..=MAX_FRAME_SIZE).contains(&self.frame_size) {
            return Err(ConfigError::FrameSize(self.frame_size));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisSection {
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self { frame_size: DEFAULT_FRAME_SIZE }
    }
}

fn default_frame_size() -> usize {
    DEFAULT_FRAME_SIZE
}

/// One `[[chain]]` entry: `kind` plus that stage's parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StageConfig {
    pub kind: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f32>,
}

impl StageConfig {
    pub fn build(&self, sr: f32) -> Result<ChainStage, ChainError> {
        let mut stage = ChainStage::from_kind(&self.kind, sr)?;
        for (name, &value) in &self.values {
            let stored = stage.set_parameter(name, value)?;
            if !value.is_finite() {
                log::warn!("{}.{name} = {value} is not a finite number, keeping {stored}", self.kind);
            }
        }
        Ok(stage)
    }
}

/// Contents of `dissonor.toml`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub analysis: AnalysisSection,
    /// Parameter name (any accepted spelling) → value.
    pub params: BTreeMap<String, f32>,
    pub chain: Vec<StageConfig>,
}

impl FileConfig {
    /// Write `[params]` into the store (clamped).
    pub fn apply_params(&self, params: &Params) -> Result<(), ConfigError> {
        for (name, &value) in &self.params {
            let id = ParamId::from_name(name).ok_or_else(|| ConfigError::UnknownParam(name.clone()))?;
            let stored = params.set(id, value);
            if !value.is_finite() {
                log::warn!("{} = {value} is not a finite number, keeping {stored}", id.name());
            } else if stored != value {
                log::warn!("{} = {value} out of range, clamped to {stored}", id.name());
            }
        }
        Ok(())
    }

    pub fn build_chain(&self, sr: f32) -> Result<Chain, ConfigError> {
        let stages = self.chain.iter().map(|s| s.build(sr)).collect::<Result<Vec<_>, _>>()?;
        Ok(Chain::new(stages))
    }
}

pub fn parse_config(text: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    let cfg = parse_config(&text)?;
    log::debug!("loaded {} ({} chain stages, {} params)", path.display(), cfg.chain.len(), cfg.params.len());
    Ok(cfg)
}
