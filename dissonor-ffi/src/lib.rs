//! C ABI wrapper for the Dissonor effect.
//!
//! Exposes a small set of functions to create/destroy an effect instance,
//! process mono f32 blocks, write parameters, and poll analysis reports.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle type: `DissonorHandle` (heap-allocated; you own/delete it).
//! - Parameter ids follow `ParamId` order: 0 freqShift, 1 dissonanceFactor,
//!   2 inputGain, 3 outputVolume, 4 rejectionBandwidth.
//!
//! Threading
//! - `dissonor_process_f32` must be called from one audio thread.
//! - `dissonor_set_param` / `dissonor_get_param` may be called from any thread.
//! - `dissonor_poll_report` must be called from one (non-audio) thread.

use std::sync::Arc;

use dissonor_engine::{
    report_channel, AnalysisError, AnalysisReport, Dissonor, Engine, EngineConfig, ParamId, Params, ReportReceiver,
    REPORT_QUEUE_DEPTH,
};

/// Opaque effect wrapper we hand to C.
pub struct DissonorHandle {
    params: Arc<Params>,
    engine: Engine<Dissonor>,
    reports: ReportReceiver,
}

impl DissonorHandle {
    fn new(sample_rate: f32, frame_size: usize) -> Option<Self> {
        let cfg = EngineConfig::new(sample_rate, frame_size).ok()?;
        let params = Arc::new(Params::new());
        let (tx, reports) = report_channel(REPORT_QUEUE_DEPTH);
        let effect = Dissonor::new(&cfg, Arc::clone(&params)).ok()?.with_reports(tx);
        Some(Self { params, engine: Engine::new(effect, cfg.sample_rate), reports })
    }
}

pub const DISSONOR_MAX_PEAKS: usize = 3;

pub const DISSONOR_FAULT_NONE: u32 = 0;
pub const DISSONOR_FAULT_TRANSFORM: u32 = 1;
pub const DISSONOR_FAULT_FRAME_SIZE: u32 = 2;
pub const DISSONOR_FAULT_NON_FINITE: u32 = 3;

/// One analysis report, flattened for C.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct DissonorReport {
    pub generation: u64,
    pub peak_count: u32,
    /// One of the `DISSONOR_FAULT_*` codes.
    pub fault: u32,
    pub frequencies: [f32; DISSONOR_MAX_PEAKS],
    pub magnitudes: [f32; DISSONOR_MAX_PEAKS],
    pub input_peak: f32,
}

impl From<&AnalysisReport> for DissonorReport {
    fn from(r: &AnalysisReport) -> Self {
        let mut out = DissonorReport {
            generation: r.generation,
            peak_count: r.peaks.len() as u32,
            fault: match r.fault {
                None => DISSONOR_FAULT_NONE,
                Some(AnalysisError::Transform(_)) => DISSONOR_FAULT_TRANSFORM,
                Some(AnalysisError::FrameSize { .. }) => DISSONOR_FAULT_FRAME_SIZE,
                Some(AnalysisError::NonFinite) => DISSONOR_FAULT_NON_FINITE,
            },
            input_peak: r.input_peak,
            ..Default::default()
        };
        for (i, p) in r.peaks.iter().enumerate().take(DISSONOR_MAX_PEAKS) {
            out.frequencies[i] = p.frequency;
            out.magnitudes[i] = p.magnitude;
        }
        out
    }
}

// --- Creation / destruction -------------------------------------------------------

/// Create an effect instance. `frame_size` must be a power of two in 64..=32768.
/// Returns null when the configuration is invalid.
#[no_mangle]
pub extern "C" fn dissonor_create(sample_rate: f32, frame_size: u32) -> *mut DissonorHandle {
    match DissonorHandle::new(sample_rate, frame_size as usize) {
        Some(h) => Box::into_raw(Box::new(h)),
        None => std::ptr::null_mut(),
    }
}

/// Destroy an instance previously returned by `dissonor_create`.
#[no_mangle]
pub extern "C" fn dissonor_destroy(handle: *mut DissonorHandle) {
    if !handle.is_null() {
        unsafe { drop(Box::from_raw(handle)); }
    }
}

/// Clear all processing state and adopt `sample_rate` (e.g., when the host changes device config).
#[no_mangle]
pub extern "C" fn dissonor_reset(handle: *mut DissonorHandle, sample_rate: f32) {
    if handle.is_null() || !(sample_rate.is_finite() && sample_rate > 0.0) { return; }
    let h = unsafe { &mut *handle };
    h.engine.reset(sample_rate);
}

// --- Processing ------------------------------------------------------------------

/// Process `frames` mono samples from `input` into `output`.
///
/// A null `input` means the host has no input for this block: `output` is
/// filled with silence and the effect state is left untouched.
/// Returns the number of frames processed (0 for silence or on error).
#[no_mangle]
pub extern "C" fn dissonor_process_f32(
    handle: *mut DissonorHandle,
    input: *const f32,
    output: *mut f32,
    frames: u32,
) -> u32 {
    if handle.is_null() || output.is_null() || frames == 0 {
        return 0;
    }
    let h = unsafe { &mut *handle };
    let n = frames as usize;
    let out = unsafe { std::slice::from_raw_parts_mut(output, n) };
    let inp = if input.is_null() { None } else { Some(unsafe { std::slice::from_raw_parts(input, n) }) };
    h.engine.process_block(inp, out) as u32
}

// --- Parameters ------------------------------------------------------------------

/// Write parameter `id` (clamped to its range). Returns the stored value, or NaN for an unknown id.
#[no_mangle]
pub extern "C" fn dissonor_set_param(handle: *const DissonorHandle, id: u32, value: f32) -> f32 {
    if handle.is_null() { return f32::NAN; }
    let h = unsafe { &*handle };
    match ParamId::from_index(id as usize) {
        Some(pid) => h.params.set(pid, value),
        None => f32::NAN,
    }
}

/// Read parameter `id`, or NaN for an unknown id.
#[no_mangle]
pub extern "C" fn dissonor_get_param(handle: *const DissonorHandle, id: u32) -> f32 {
    if handle.is_null() { return f32::NAN; }
    let h = unsafe { &*handle };
    ParamId::from_index(id as usize).map_or(f32::NAN, |pid| h.params.get(pid))
}

// --- Reports ---------------------------------------------------------------------

/// Write the newest pending report into `out`, discarding older ones.
/// Returns 1 if a report was written, 0 if none was pending.
#[no_mangle]
pub extern "C" fn dissonor_poll_report(handle: *mut DissonorHandle, out: *mut DissonorReport) -> i32 {
    if handle.is_null() || out.is_null() { return 0; }
    let h = unsafe { &mut *handle };
    match h.reports.latest() {
        Some(r) => {
            unsafe { *out = DissonorReport::from(&r); }
            1
        }
        None => 0,
    }
}
