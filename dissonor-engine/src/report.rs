//! Analysis reports handed from the audio thread to a consumer.
//!
//! The audio side publishes into a bounded lock-free queue with `force_push`,
//! evicting the oldest report when the consumer falls behind. Publishing never
//! blocks and never allocates. Each report carries a generation number so the
//! consumer can tell how many it missed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_queue::ArrayQueue;
use dissonor_core::peaks::PeakList;

use crate::analyzer::AnalysisError;

/// Default number of reports buffered between producer and consumer.
pub const REPORT_QUEUE_DEPTH: usize = 8;

/// Outcome of one frame's analysis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AnalysisReport {
    /// 1 for the first completed frame, then increasing by one per frame.
    pub generation: u64,
    pub peaks: PeakList,
    /// Set when analysis failed; `peaks` is then empty.
    pub fault: Option<AnalysisError>,
    /// Largest absolute input sample in the analyzed frame (after input gain).
    pub input_peak: f32,
}

#[derive(Debug, Default)]
struct Counters {
    evicted: AtomicU64,
    faults: AtomicU64,
}

/// Audio-thread end.
#[derive(Debug)]
pub struct ReportSender {
    queue: Arc<ArrayQueue<AnalysisReport>>,
    counters: Arc<Counters>,
    generation: u64,
}

/// Consumer end.
#[derive(Debug)]
pub struct ReportReceiver {
    queue: Arc<ArrayQueue<AnalysisReport>>,
    counters: Arc<Counters>,
    last_generation: u64,
    missed: u64,
}

/// Bounded report channel holding at most `depth` (>= 1) reports.
pub fn report_channel(depth: usize) -> (ReportSender, ReportReceiver) {
    let queue = Arc::new(ArrayQueue::new(depth.max(1)));
    let counters = Arc::new(Counters::default());
    (
        ReportSender { queue: Arc::clone(&queue), counters: Arc::clone(&counters), generation: 0 },
        ReportReceiver { queue, counters, last_generation: 0, missed: 0 },
    )
}

impl ReportSender {
    /// Publish the result of one frame. Returns its generation.
    pub fn publish(&mut self, peaks: PeakList, fault: Option<AnalysisError>, input_peak: f32) -> u64 {
        self.generation += 1;
        if fault.is_some() {
            self.counters.faults.fetch_add(1, Ordering::Relaxed);
        }
        let report = AnalysisReport { generation: self.generation, peaks, fault, input_peak };
        if self.queue.force_push(report).is_some() {
            self.counters.evicted.fetch_add(1, Ordering::Relaxed);
        }
        self.generation
    }

    #[inline] pub fn generation(&self) -> u64 { self.generation }
}

impl ReportReceiver {
    /// Oldest buffered report, if any.
    pub fn try_recv(&mut self) -> Option<AnalysisReport> {
        let r = self.queue.pop()?;
        self.missed += r.generation.saturating_sub(self.last_generation + 1);
        self.last_generation = r.generation;
        Some(r)
    }

    /// Drain the queue and return only the newest report.
    pub fn latest(&mut self) -> Option<AnalysisReport> {
        let mut newest = None;
        while let Some(r) = self.try_recv() {
            newest = Some(r);
        }
        newest
    }

    /// Reports evicted before the consumer saw them.
    #[inline] pub fn missed(&self) -> u64 { self.missed }

    /// Times the producer had to overwrite an unread report.
    #[inline] pub fn evicted(&self) -> u64 { self.counters.evicted.load(Ordering::Relaxed) }

    /// Total frames whose analysis faulted.
    #[inline] pub fn fault_count(&self) -> u64 { self.counters.faults.load(Ordering::Relaxed) }

    #[inline] pub fn last_generation(&self) -> u64 { self.last_generation }
}
