//! Stress tests for EVIO handles.
//!
//! These helpers drive the registry under heavy load and concurrent access.

use crate::fixtures::flat_event;
use evio_core::{EvioResult, InMemoryBackend, OpenOptions, Registry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Events per stream.
    pub events: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Data words per event.
    pub event_words: usize,
    /// Block size in words for written streams.
    pub block_words: u32,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            events: 10_000,
            threads: 4,
            event_words: 32,
            block_words: 4096,
        }
    }
}

impl StressConfig {
    fn options(&self) -> OpenOptions {
        OpenOptions::new().block_words(self.block_words)
    }
}

/// Writes `config.events` flat events into a fresh buffer.
pub fn stress_sequential_writes(config: &StressConfig) -> (InMemoryBackend, StressTestResult) {
    let registry = Registry::new();
    let buffer = InMemoryBackend::new();
    let start = Instant::now();
    let mut successful = 0;
    let mut failed = 0;

    match registry.open_with(buffer.clone(), "wb", &config.options()) {
        Ok(handle) => {
            for i in 0..config.events {
                match registry.write(handle, &flat_event(i as u32, config.event_words)) {
                    Ok(()) => successful += 1,
                    Err(_) => failed += 1,
                }
            }
            if registry.close(handle).is_err() {
                failed += 1;
            }
        }
        Err(_) => failed += config.events,
    }

    (buffer, StressTestResult::new(successful, failed, start.elapsed()))
}

/// Reads every event of `buffer` sequentially, checking each against the
/// event [`stress_sequential_writes`] wrote at that position.
pub fn stress_sequential_reads(buffer: &InMemoryBackend, config: &StressConfig) -> StressTestResult {
    let registry = Registry::new();
    let start = Instant::now();
    let mut successful = 0;
    let mut failed = 0;

    if let Ok(handle) = registry.open(buffer.clone(), "rb") {
        let mut i = 0u32;
        loop {
            match registry.read_alloc(handle) {
                Ok(Some(event)) if event == flat_event(i, config.event_words) => successful += 1,
                Ok(Some(_)) | Err(_) => failed += 1,
                Ok(None) => break,
            }
            i += 1;
            if i as usize > config.events {
                break;
            }
        }
        let _ = registry.close(handle);
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Several threads read one shared handle until it is exhausted.
///
/// Every event must arrive whole and exactly once across all threads.
pub fn stress_concurrent_reads(
    buffer: &InMemoryBackend,
    config: &StressConfig,
) -> EvioResult<StressTestResult> {
    let registry = Arc::new(Registry::new());
    let handle = registry.open(buffer.clone(), "rb")?;
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let threads: Vec<_> = (0..config.threads)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let words = config.event_words;

            thread::spawn(move || loop {
                match registry.read_alloc(handle) {
                    Ok(Some(event)) => {
                        if event == flat_event(event[2], words) {
                            successful.fetch_add(1, Ordering::Relaxed);
                        } else {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Ok(None) => break,
                    Err(_) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                }
            })
        })
        .collect();

    for thread in threads {
        thread.join().expect("Thread panicked");
    }
    registry.close(handle)?;

    Ok(StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    ))
}

/// Each thread writes its own buffer through a shared registry.
pub fn stress_concurrent_writers(config: &StressConfig) -> StressTestResult {
    let registry = Arc::new(Registry::new());
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let per_thread = config.events / config.threads.max(1);

    let start = Instant::now();

    let threads: Vec<_> = (0..config.threads)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let options = config.options();
            let words = config.event_words;

            thread::spawn(move || {
                let Ok(handle) = registry.open_with(InMemoryBackend::new(), "wb", &options) else {
                    failed.fetch_add(per_thread, Ordering::Relaxed);
                    return;
                };
                for i in 0..per_thread {
                    match registry.write(handle, &flat_event(i as u32, words)) {
                        Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
                if registry.close(handle).is_err() {
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for thread in threads {
        thread.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> StressConfig {
        StressConfig {
            events: 2_000,
            threads: 4,
            event_words: 8,
            block_words: 512,
        }
    }

    #[test]
    fn write_then_read() {
        let config = small();
        let (buffer, writes) = stress_sequential_writes(&config);
        assert_eq!(writes.successful_ops, config.events);
        assert_eq!(writes.failed_ops, 0);

        let reads = stress_sequential_reads(&buffer, &config);
        assert_eq!(reads.successful_ops, config.events);
        assert_eq!(reads.failed_ops, 0);
    }

    #[test]
    fn concurrent_reads_see_each_event_once() {
        let config = small();
        let (buffer, _) = stress_sequential_writes(&config);
        let result = stress_concurrent_reads(&buffer, &config).unwrap();
        assert_eq!(result.successful_ops, config.events);
        assert_eq!(result.failed_ops, 0);
    }

    #[test]
    fn concurrent_writers() {
        let config = small();
        let result = stress_concurrent_writers(&config);
        assert_eq!(result.successful_ops, config.events);
        assert_eq!(result.failed_ops, 0);
    }
}
