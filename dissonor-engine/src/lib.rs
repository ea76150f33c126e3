//! Dissonor Engine: realtime glue around the core DSP.
//!
//! Crate layout:
//! - [`graph`]     : `Effect` trait and `Engine<E>` block driver
//! - [`effect`]    : the `Dissonor` effect (frame → analysis → oscillators → output)
//! - [`params`]    : lock-free parameter store shared with control threads
//! - [`frame`]     : analysis frame + previous-output ring on one index
//! - [`analyzer`]  : window/FFT/rejection/rolloff/peak pipeline
//! - [`rejection`] : frequency history and time-domain feedback cancellation
//! - [`synth`]     : oscillator bank following detected peaks
//! - [`report`]    : lossy analysis-report queue for non-realtime consumers
//! - [`chain`], [`nodes`], [`delay`] : optional post stages (boost, echo)
//! - [`config`]    : `EngineConfig` and the TOML config file
//!
//! Buffers are allocated at construction; the audio thread never allocates,
//! locks or logs.

pub mod analyzer;
pub mod chain;
pub mod config;
pub mod delay;
pub mod effect;
pub mod frame;
pub mod graph;
pub mod nodes;
pub mod params;
pub mod rejection;
pub mod report;
pub mod synth;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use analyzer::{AnalysisError, SpectralAnalyzer};
pub use chain::{Chain, ChainError, ChainStage, Stage};
pub use config::{load_config, parse_config, ConfigError, EngineConfig, FileConfig};
pub use effect::Dissonor;
pub use graph::{Effect, Engine};
pub use params::{ParamError, ParamId, ParamSnapshot, Params};
pub use report::{report_channel, AnalysisReport, ReportReceiver, ReportSender, REPORT_QUEUE_DEPTH};
