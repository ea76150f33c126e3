use std::path::PathBuf;

use clap::Parser;
use dissonor_engine::ParamId;

#[derive(Parser, Debug)]
#[command(name = "dissonor", about = "Real-time dissonance effect: hears partials, plays them back detuned")]
pub struct Cli {
    /// List input and output devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Capture device name (default input device when omitted)
    #[arg(long)]
    pub input_device: Option<String>,

    /// Playback device name (default output device when omitted)
    #[arg(long)]
    pub output_device: Option<String>,

    /// Requested sample rate in Hz; both devices must support it
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Analysis frame size (power of two, 64..=32768)
    #[arg(long)]
    pub frame_size: Option<usize>,

    /// Stop after this many seconds
    #[arg(long)]
    pub duration: Option<u64>,

    /// Config file (defaults to ./dissonor.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Hz added to every synthesized frequency (0-500)
    #[arg(long)]
    pub freq_shift: Option<f32>,

    /// Multiplier applied to detected frequencies (1-2)
    #[arg(long)]
    pub dissonance_factor: Option<f32>,

    /// Gain applied to the input before analysis (0.1-5)
    #[arg(long)]
    pub input_gain: Option<f32>,

    /// Output volume (0-1)
    #[arg(long)]
    pub output_volume: Option<f32>,

    /// Width in Hz around recent output frequencies that is damped (5-50)
    #[arg(long)]
    pub rejection_bandwidth: Option<f32>,

    /// Log every analysis report
    #[arg(long)]
    pub report: bool,

    /// Do not read `name=value` parameter lines from stdin
    #[arg(long)]
    pub no_stdin: bool,
}

impl Cli {
    /// Parameter values given on the command line.
    pub fn param_overrides(&self) -> impl Iterator<Item = (ParamId, f32)> {
        [
            (ParamId::FreqShift, self.freq_shift),
            (ParamId::DissonanceFactor, self.dissonance_factor),
            (ParamId::InputGain, self.input_gain),
            (ParamId::OutputVolume, self.output_volume),
            (ParamId::RejectionBandwidth, self.rejection_bandwidth),
        ]
        .into_iter()
        .filter_map(|(id, v)| v.map(|v| (id, v)))
    }
}
