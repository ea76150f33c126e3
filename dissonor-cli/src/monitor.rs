//! Non-realtime side of the host: report logging, meter, and stdin parameter control.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use dissonor_engine::{AnalysisReport, Params, ReportReceiver};

use crate::audio::StreamStats;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const METER_INTERVAL: Duration = Duration::from_secs(1);

/// Drains analysis reports, logs them, and emits a once-per-second meter.
pub fn spawn_report_logger(
    mut rx: ReportReceiver,
    stats: Arc<StreamStats>,
    verbose: bool,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut last_meter = Instant::now();
        let mut level = 0.0f32;
        let mut seen_missed = 0;
        let mut seen_under = 0;
        let mut seen_over = 0;

        while !stop.load(Ordering::Relaxed) {
            while let Some(r) = rx.try_recv() {
                level = level.max(r.input_peak);
                log_report(&r, verbose);
            }

            if last_meter.elapsed() >= METER_INTERVAL {
                log::info!("[meter] input peak ~ {level:.3}");
                level = 0.0;
                last_meter = Instant::now();

                let missed = rx.missed();
                if missed > seen_missed {
                    log::warn!("{} analysis reports dropped (consumer too slow)", missed - seen_missed);
                    seen_missed = missed;
                }
                let (under, over) = stats.snapshot();
                if under > seen_under {
                    log::warn!("{} output blocks played silence (input not ready)", under - seen_under);
                    seen_under = under;
                }
                if over > seen_over {
                    log::warn!("{} captured samples discarded (ring full)", over - seen_over);
                    seen_over = over;
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
        log::debug!("report logger stopped after generation {}", rx.last_generation());
    })
}

fn log_report(r: &AnalysisReport, verbose: bool) {
    if let Some(fault) = &r.fault {
        log::warn!("frame {}: analysis fault: {fault}", r.generation);
        return;
    }
    if !verbose {
        return;
    }
    if r.peaks.is_empty() {
        log::info!("frame {}: no peaks", r.generation);
        return;
    }
    let peaks: Vec<String> =
        r.peaks.iter().map(|p| format!("{:.1} Hz ({:.3})", p.frequency, p.magnitude)).collect();
    log::info!("frame {}: {}", r.generation, peaks.join(", "));
}

/// Parse a `name=value` control line. Blank lines and `#` comments yield `None`.
pub fn parse_assignment(line: &str) -> Option<Result<(&str, f32), String>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let Some((name, value)) = line.split_once('=') else {
        return Some(Err(format!("expected name=value, got `{line}`")));
    };
    let name = name.trim();
    Some(
        value
            .trim()
            .parse::<f32>()
            .map(|v| (name, v))
            .map_err(|e| format!("bad value for `{name}`: {e}")),
    )
}

/// Reads parameter assignments from stdin until EOF.
pub fn spawn_stdin_control(params: Arc<Params>) -> JoinHandle<()> {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    log::warn!("stdin closed: {e}");
                    break;
                }
            };
            match parse_assignment(&line) {
                None => {}
                Some(Err(msg)) => log::warn!("{msg}"),
                Some(Ok((name, value))) => match params.set_by_name(name, value) {
                    Ok(stored) => log::info!("{name} = {stored}"),
                    Err(e) => log::warn!("{e}"),
                },
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments() {
        assert_eq!(parse_assignment("freqShift=120"), Some(Ok(("freqShift", 120.0))));
        assert_eq!(parse_assignment("  output_volume = 0.25 "), Some(Ok(("output_volume", 0.25))));
        assert_eq!(parse_assignment(""), None);
        assert_eq!(parse_assignment("# comment"), None);
        assert!(matches!(parse_assignment("freqShift"), Some(Err(_))));
        assert!(matches!(parse_assignment("freqShift=abc"), Some(Err(_))));
    }
}
