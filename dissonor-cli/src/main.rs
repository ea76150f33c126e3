//! Dissonor CLI. Live host: capture → dissonance effect → playback.

mod audio;
mod cli;
mod monitor;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cpal::traits::{DeviceTrait, StreamTrait};
use dissonor_engine::config::DEFAULT_CONFIG_FILE;
use dissonor_engine::{
    load_config, report_channel, Dissonor, Engine, EngineConfig, FileConfig, Params, REPORT_QUEUE_DEPTH,
};
use ringbuf::HeapRb;

use audio::{Direction, StreamStats};
use cli::Cli;

/// Capture ring length relative to one analysis frame.
const RING_FRAMES: usize = 4;

fn load_file_config(cli: &Cli) -> Result<FileConfig> {
    if let Some(path) = &cli.config {
        return load_config(path).with_context(|| format!("loading {}", path.display()));
    }
    let default = Path::new(DEFAULT_CONFIG_FILE);
    if default.exists() {
        return load_config(default).with_context(|| format!("loading {DEFAULT_CONFIG_FILE}"));
    }
    Ok(FileConfig::default())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if cli.list_devices {
        return audio::list_devices();
    }

    let file_cfg = load_file_config(&cli)?;

    let out_dev = audio::pick_device(Direction::Output, cli.output_device.as_deref())?;
    let out_sup = audio::choose_config(&out_dev, Direction::Output, cli.sample_rate)?;
    let sr = out_sup.sample_rate().0;
    let in_dev = audio::pick_device(Direction::Input, cli.input_device.as_deref())?;
    let in_sup = audio::choose_config(&in_dev, Direction::Input, Some(sr))?;

    let frame_size = cli.frame_size.unwrap_or(file_cfg.analysis.frame_size);
    let engine_cfg = EngineConfig::new(sr as f32, frame_size).context("engine configuration")?;

    let params = Arc::new(Params::new());
    file_cfg.apply_params(&params)?;
    for (id, value) in cli.param_overrides() {
        let stored = params.set(id, value);
        log::debug!("{} = {stored} (command line)", id.name());
    }
    let chain = file_cfg.build_chain(engine_cfg.sample_rate)?;

    let (tx, rx) = report_channel(REPORT_QUEUE_DEPTH);
    let effect = Dissonor::new(&engine_cfg, Arc::clone(&params))
        .context("creating effect")?
        .with_reports(tx);
    let engine = Engine::new(effect, engine_cfg.sample_rate).with_chain(chain);

    let (producer, consumer) = HeapRb::<f32>::new(engine_cfg.frame_size * RING_FRAMES).split();
    let stats = Arc::new(StreamStats::default());

    log::info!("input:  {} ({:?})", in_dev.name()?, in_sup);
    log::info!("output: {} ({:?})", out_dev.name()?, out_sup);
    log::info!(
        "frame {} samples ({:.1} ms), {} post stages",
        engine_cfg.frame_size,
        1000.0 * engine_cfg.frame_size as f32 / engine_cfg.sample_rate,
        file_cfg.chain.len()
    );

    let in_stream = audio::input_stream(&in_dev, &in_sup, producer, Arc::clone(&stats))?;
    let out_stream = audio::output_stream(&out_dev, &out_sup, engine, consumer, Arc::clone(&stats))?;

    let stop = Arc::new(AtomicBool::new(false));
    let logger = monitor::spawn_report_logger(rx, Arc::clone(&stats), cli.report, Arc::clone(&stop));
    if !cli.no_stdin {
        // detached: blocks on stdin until EOF
        monitor::spawn_stdin_control(Arc::clone(&params));
        log::info!("type name=value to change a parameter (e.g. freqShift=150)");
    }

    in_stream.play().context("starting capture")?;
    out_stream.play().context("starting playback")?;

    match cli.duration {
        Some(d) => {
            log::info!("auto-stop after {d} seconds");
            std::thread::sleep(Duration::from_secs(d));
        }
        None => {
            log::info!("press Ctrl+C to stop");
            loop {
                std::thread::sleep(Duration::from_millis(500));
            }
        }
    }

    drop(out_stream);
    drop(in_stream);
    stop.store(true, Ordering::Relaxed);
    if logger.join().is_err() {
        log::warn!("report logger panicked");
    }
    Ok(())
}
