//! cpal plumbing: device selection, stream configuration, and the two callbacks.
//!
//! Capture pushes mono samples into a lock-free SPSC ring; the playback
//! callback pulls exactly one block's worth per chunk and runs the engine. If
//! the ring does not hold a full chunk, the engine is told the input is missing
//! and plays silence for that chunk.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{FromSample, Sample, SizedSample};
use dissonor_engine::{Dissonor, Engine};
use ringbuf::{HeapConsumer, HeapProducer};

/// Largest chunk processed in one engine call; callback buffers are split to fit.
pub const MAX_CHUNK: usize = 4096;

/// Counters shared between the callbacks and the logger thread.
#[derive(Debug, Default)]
pub struct StreamStats {
    underruns: AtomicU64,
    overruns: AtomicU64,
}

impl StreamStats {
    /// `(silent output chunks, dropped input samples)`
    pub fn snapshot(&self) -> (u64, u64) {
        (self.underruns.load(Ordering::Relaxed), self.overruns.load(Ordering::Relaxed))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

pub fn list_devices() -> Result<()> {
    let host = cpal::default_host();
    println!("Input devices:");
    for dev in host.input_devices()? {
        println!("- {}", dev.name()?);
    }
    println!("Output devices:");
    for dev in host.output_devices()? {
        println!("- {}", dev.name()?);
    }
    Ok(())
}

pub fn pick_device(dir: Direction, name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    if let Some(name) = name {
        let mut devices = match dir {
            Direction::Input => host.input_devices()?,
            Direction::Output => host.output_devices()?,
        };
        return devices
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| anyhow!("requested {dir:?} device not found: {name}"));
    }
    match dir {
        Direction::Input => host.default_input_device(),
        Direction::Output => host.default_output_device(),
    }
    .ok_or_else(|| anyhow!("no default {dir:?} device"))
}

/// Pick a concrete stream config, preferring one that runs at `req_sr`.
pub fn choose_config(device: &cpal::Device, dir: Direction, req_sr: Option<u32>) -> Result<cpal::SupportedStreamConfig> {
    let default = match dir {
        Direction::Input => device.default_input_config()?,
        Direction::Output => device.default_output_config()?,
    };
    let Some(sr) = req_sr else {
        return Ok(default);
    };
    if default.sample_rate().0 == sr {
        return Ok(default);
    }

    let ranges: Vec<cpal::SupportedStreamConfigRange> = match dir {
        Direction::Input => device.supported_input_configs()?.collect(),
        Direction::Output => device.supported_output_configs()?.collect(),
    };

    // Pick a SupportedStreamConfigRange first: matching rate, then closest channel count.
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in ranges {
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;
        let sr_pen = if (sr_min..=sr_max).contains(&sr) {
            0
        } else {
            u64::from(sr_min.abs_diff(sr).min(sr_max.abs_diff(sr)))
        };
        let ch_pen = u64::from(range.channels().abs_diff(default.channels()));
        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or_else(|| anyhow!("no supported {dir:?} configs"))?;
    let lo = range.min_sample_rate().0;
    let hi = range.max_sample_rate().0;
    if !(lo..=hi).contains(&sr) {
        bail!("{dir:?} device cannot run at {sr} Hz (closest range {lo}..={hi})");
    }
    Ok(range.with_sample_rate(cpal::SampleRate(sr)))
}

pub fn build_input_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut producer: HeapProducer<f32>,
    stats: Arc<StreamStats>,
) -> Result<cpal::Stream>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let channels = usize::from(cfg.channels.max(1));
    let scale = 1.0 / channels as f32;
    let err_fn = |e: cpal::StreamError| log::error!("input stream error: {e}");

    let stream = device
        .build_input_stream(
            cfg,
            move |input: &[T], _| {
                let mut dropped = 0u64;
                for frame in input.chunks(channels) {
                    let mono = frame.iter().map(|s| s.to_sample::<f32>()).sum::<f32>() * scale;
                    if producer.push(mono).is_err() {
                        dropped += 1;
                    }
                }
                if dropped > 0 {
                    stats.overruns.fetch_add(dropped, Ordering::Relaxed);
                }
            },
            err_fn,
            None,
        )
        .context("building input stream")?;
    Ok(stream)
}

pub fn build_output_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut engine: Engine<Dissonor>,
    mut consumer: HeapConsumer<f32>,
    stats: Arc<StreamStats>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    let channels = usize::from(cfg.channels.max(1));
    let mut inbuf = vec![0.0f32; MAX_CHUNK];
    let mut outbuf = vec![0.0f32; MAX_CHUNK];
    let err_fn = |e: cpal::StreamError| log::error!("output stream error: {e}");

    let stream = device
        .build_output_stream(
            cfg,
            move |output: &mut [T], _| {
                for chunk in output.chunks_mut(MAX_CHUNK * channels) {
                    let frames = chunk.len() / channels;
                    let out = &mut outbuf[..frames];
                    if consumer.len() >= frames {
                        let got = consumer.pop_slice(&mut inbuf[..frames]);
                        engine.process_block(Some(&inbuf[..got]), out);
                    } else {
                        engine.process_block(None, out);
                        stats.underruns.fetch_add(1, Ordering::Relaxed);
                    }
                    for (frame, &s) in chunk.chunks_mut(channels).zip(out.iter()) {
                        let v = T::from_sample(s.clamp(-1.0, 1.0));
                        for ch in frame.iter_mut() {
                            *ch = v;
                        }
                    }
                }
            },
            err_fn,
            None,
        )
        .context("building output stream")?;
    Ok(stream)
}

/// Dispatch `build_input_stream` on the device's sample format.
pub fn input_stream(
    device: &cpal::Device,
    sup: &cpal::SupportedStreamConfig,
    producer: HeapProducer<f32>,
    stats: Arc<StreamStats>,
) -> Result<cpal::Stream> {
    let cfg = sup.config();
    match sup.sample_format() {
        cpal::SampleFormat::F32 => build_input_stream::<f32>(device, &cfg, producer, stats),
        cpal::SampleFormat::I16 => build_input_stream::<i16>(device, &cfg, producer, stats),
        cpal::SampleFormat::U16 => build_input_stream::<u16>(device, &cfg, producer, stats),
        other => bail!("unsupported input sample format: {other:?}"),
    }
}

/// Dispatch `build_output_stream` on the device's sample format.
pub fn output_stream(
    device: &cpal::Device,
    sup: &cpal::SupportedStreamConfig,
    engine: Engine<Dissonor>,
    consumer: HeapConsumer<f32>,
    stats: Arc<StreamStats>,
) -> Result<cpal::Stream> {
    let cfg = sup.config();
    match sup.sample_format() {
        cpal::SampleFormat::F32 => build_output_stream::<f32>(device, &cfg, engine, consumer, stats),
        cpal::SampleFormat::I16 => build_output_stream::<i16>(device, &cfg, engine, consumer, stats),
        cpal::SampleFormat::U16 => build_output_stream::<u16>(device, &cfg, engine, consumer, stats),
        other => bail!("unsupported output sample format: {other:?}"),
    }
}
