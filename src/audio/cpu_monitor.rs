// CPU Monitor - Block fill load tracking
//
// The producer must render each block faster than the transfer drains one.
// This tracks fill time as a fraction of a block's playback time so the
// control thread can warn before blocks start repeating.
// Uses atomics so the fill loop and the reporting thread share metrics.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::audio::timing::frames_to_duration;

/// Fill-time monitor for the producer
#[derive(Clone)]
pub struct CpuMonitor {
    total_fill_ns: Arc<AtomicU64>,
    worst_fill_ns: Arc<AtomicU64>,
    blocks: Arc<AtomicU64>,

    // Playback time of one block
    block_ns: u64,
}

impl CpuMonitor {
    /// Create a monitor for blocks of `frames_per_block` at `sample_rate`
    pub fn new(sample_rate: u32, frames_per_block: usize) -> Self {
        let block_ns = frames_to_duration(frames_per_block, sample_rate).as_nanos() as u64;

        Self {
            total_fill_ns: Arc::new(AtomicU64::new(0)),
            worst_fill_ns: Arc::new(AtomicU64::new(0)),
            blocks: Arc::new(AtomicU64::new(0)),
            block_ns: block_ns.max(1),
        }
    }

    /// Start timing one block fill
    #[inline]
    pub fn start_measure(&self) -> Instant {
        Instant::now()
    }

    /// Finish timing the fill started at `start`
    #[inline]
    pub fn end_measure(&self, start: Instant) {
        self.record(start.elapsed());
    }

    /// Account one block fill that took `elapsed`
    pub fn record(&self, elapsed: Duration) {
        let elapsed_ns = elapsed.as_nanos() as u64;
        self.total_fill_ns.fetch_add(elapsed_ns, Ordering::Relaxed);
        self.worst_fill_ns.fetch_max(elapsed_ns, Ordering::Relaxed);
        self.blocks.fetch_add(1, Ordering::Relaxed);
    }

    /// Average fill time as a percentage of block playback time.
    ///
    /// Can exceed 100% when the producer falls behind.
    pub fn get_cpu_percentage(&self) -> f32 {
        let blocks = self.blocks.load(Ordering::Relaxed);
        if blocks == 0 {
            return 0.0;
        }

        let total = self.total_fill_ns.load(Ordering::Relaxed);
        (total as f64 / (blocks * self.block_ns) as f64 * 100.0) as f32
    }

    /// Slowest single fill as a percentage of block playback time
    pub fn get_worst_percentage(&self) -> f32 {
        let worst = self.worst_fill_ns.load(Ordering::Relaxed);
        (worst as f64 / self.block_ns as f64 * 100.0) as f32
    }

    /// Number of measured fills
    pub fn get_sample_count(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    pub fn block_duration(&self) -> Duration {
        Duration::from_nanos(self.block_ns)
    }

    /// Load level from the worst fill seen
    ///
    /// - `CpuLoad::Low` if < 50%
    /// - `CpuLoad::Medium` if 50-75%
    /// - `CpuLoad::High` if > 75%
    pub fn get_load_level(&self) -> CpuLoad {
        let worst = self.get_worst_percentage();

        if worst < 50.0 {
            CpuLoad::Low
        } else if worst < 75.0 {
            CpuLoad::Medium
        } else {
            CpuLoad::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuLoad {
    Low,
    Medium,
    High,
}
