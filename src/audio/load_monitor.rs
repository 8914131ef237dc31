// Load Monitor - Mix pass performance tracking
//
// Measures how long a mix pass takes compared to the time the hardware
// needs to play one window. A pass that regularly takes longer than a
// period means the hardware side will replay stale buffers.
// Uses atomics so the worker thread and the owner can share one monitor.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Mix pass load monitor
///
/// Only one pass out of `measure_every_n` is timed to keep the overhead off
/// the common path.
#[derive(Clone)]
pub struct LoadMonitor {
    total_mix_time_ns: Arc<AtomicU64>,
    total_period_time_ns: Arc<AtomicU64>,
    measured_count: Arc<AtomicU64>,
    overruns: Arc<AtomicU64>,

    period_ns: u64,

    measure_every_n: u32,
    current_count: Arc<AtomicU32>,
}

impl LoadMonitor {
    /// Create a monitor for passes that must complete within `period`
    pub fn new(period: Duration, measure_every_n: u32) -> Self {
        Self {
            total_mix_time_ns: Arc::new(AtomicU64::new(0)),
            total_period_time_ns: Arc::new(AtomicU64::new(0)),
            measured_count: Arc::new(AtomicU64::new(0)),
            overruns: Arc::new(AtomicU64::new(0)),
            period_ns: period.as_nanos() as u64,
            measure_every_n: measure_every_n.max(1),
            current_count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Start a measurement, `None` when this pass is not sampled
    #[inline]
    pub fn start_measure(&self) -> Option<Instant> {
        let count = self.current_count.fetch_add(1, Ordering::Relaxed);

        if count % self.measure_every_n == 0 {
            Some(Instant::now())
        } else {
            None
        }
    }

    /// End a measurement started with `start_measure`
    #[inline]
    pub fn end_measure(&self, start_time: Option<Instant>) {
        if let Some(start) = start_time {
            self.record(start.elapsed());
        }
    }

    /// Account one measured pass of the given duration
    pub fn record(&self, elapsed: Duration) {
        let elapsed_ns = elapsed.as_nanos() as u64;

        self.total_mix_time_ns.fetch_add(elapsed_ns, Ordering::Relaxed);
        self.total_period_time_ns
            .fetch_add(self.period_ns, Ordering::Relaxed);
        self.measured_count.fetch_add(1, Ordering::Relaxed);

        if elapsed_ns > self.period_ns {
            let overruns = self.overruns.fetch_add(1, Ordering::Relaxed) + 1;
            // First overrun, then every 100th, to keep the log readable
            if overruns == 1 || overruns % 100 == 0 {
                log::warn!(
                    "Mix pass took {:?}, longer than the {:?} period ({} overruns)",
                    elapsed,
                    Duration::from_nanos(self.period_ns),
                    overruns
                );
            }
        }
    }

    /// Mix time as a percentage of the available time (can exceed 100)
    pub fn load_percentage(&self) -> f32 {
        let total_mix = self.total_mix_time_ns.load(Ordering::Relaxed);
        let total_period = self.total_period_time_ns.load(Ordering::Relaxed);

        if total_period == 0 {
            return 0.0;
        }

        (total_mix as f64 / total_period as f64 * 100.0) as f32
    }

    pub fn measured_count(&self) -> u64 {
        self.measured_count.load(Ordering::Relaxed)
    }

    /// Measured passes that took longer than one period
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.total_mix_time_ns.store(0, Ordering::Relaxed);
        self.total_period_time_ns.store(0, Ordering::Relaxed);
        self.measured_count.store(0, Ordering::Relaxed);
        self.overruns.store(0, Ordering::Relaxed);
        self.current_count.store(0, Ordering::Relaxed);
    }

    /// - `Low` below 50%
    /// - `Medium` from 50% to 75%
    /// - `High` above 75%
    pub fn load_level(&self) -> LoadLevel {
        let load = self.load_percentage();

        if load < 50.0 {
            LoadLevel::Low
        } else if load < 75.0 {
            LoadLevel::Medium
        } else {
            LoadLevel::High
        }
    }
}

impl std::fmt::Debug for LoadMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadMonitor")
            .field("period_ns", &self.period_ns)
            .field("load_percentage", &self.load_percentage())
            .field("overruns", &self.overruns())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadLevel {
    Low,
    Medium,
    High,
}
