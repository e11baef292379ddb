//! Phase timing and memory sampling for the parser stage. The sampler runs
//! on its own thread, updates a peak counter through compare-and-swap at
//! roughly one-second intervals, and is torn down deterministically when the
//! stage ends.

use crossbeam_channel::{bounded, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use sysinfo::{ProcessesToUpdate, System};
use tracing::warn;

const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);
const CONSTRUCTION_WARN_THRESHOLD: Duration = Duration::from_secs(30);
const MEMORY_GROWTH_WARN_BYTES: u64 = 1 << 30;

pub fn current_memory_bytes() -> u64 {
    let Ok(pid) = sysinfo::get_current_pid() else {
        return 0;
    };
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).map(|p| p.memory()).unwrap_or(0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemorySample {
    pub start_bytes: u64,
    pub end_bytes: u64,
    pub peak_bytes: u64,
}

pub struct MemorySampler {
    stop: Sender<()>,
    handle: JoinHandle<()>,
    peak: Arc<AtomicU64>,
    start_bytes: u64,
}

impl MemorySampler {
    pub fn start() -> Self {
        let start_bytes = current_memory_bytes();
        let peak = Arc::new(AtomicU64::new(start_bytes));
        let (stop, stop_rx) = bounded::<()>(1);

        let thread_peak = Arc::clone(&peak);
        let handle = std::thread::spawn(move || loop {
            match stop_rx.recv_timeout(SAMPLE_INTERVAL) {
                Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    raise_peak(&thread_peak, current_memory_bytes());
                }
            }
        });

        Self {
            stop,
            handle,
            peak,
            start_bytes,
        }
    }

    /// Stops the sampler thread and folds in a final sample.
    pub fn finish(self) -> MemorySample {
        let end_bytes = current_memory_bytes();
        raise_peak(&self.peak, end_bytes);
        let _ = self.stop.send(());
        let _ = self.handle.join();
        MemorySample {
            start_bytes: self.start_bytes,
            end_bytes,
            peak_bytes: self.peak.load(Ordering::Relaxed),
        }
    }
}

fn raise_peak(peak: &AtomicU64, sample: u64) {
    let mut current = peak.load(Ordering::Relaxed);
    while sample > current {
        match peak.compare_exchange_weak(current, sample, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(observed) => current = observed,
        }
    }
}

/// Logs the documented threshold warnings after construction finishes.
pub fn check_thresholds(construction: Duration, sample: &MemorySample) {
    if construction > CONSTRUCTION_WARN_THRESHOLD {
        warn!(
            "construction took {:.1}s, exceeding the {}s threshold",
            construction.as_secs_f64(),
            CONSTRUCTION_WARN_THRESHOLD.as_secs()
        );
    }
    let growth = sample.end_bytes.saturating_sub(sample.start_bytes);
    if growth > MEMORY_GROWTH_WARN_BYTES {
        warn!(
            "memory grew by {} MiB during construction, exceeding the 1 GiB threshold",
            growth >> 20
        );
    }
}
