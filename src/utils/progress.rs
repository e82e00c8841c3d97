//! Progress tracking for long-running operations.
//!
//! Used by the pipeline for the per-image enhancement batch, which may run
//! across several blocking workers. Uses an atomic counter so clones can
//! report from any thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Progress reporter with optional terminal output
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    /// Name of the operation being tracked
    name: String,

    /// Total units of work (0 if unknown)
    total: usize,

    /// Current progress (atomic for thread safety)
    current: Arc<AtomicUsize>,

    /// Start time for calculating throughput
    start_time: Instant,

    /// Whether to show progress output
    quiet: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    ///
    /// - `name`: Description of the operation
    /// - `total`: Total number of units of work (0 for indeterminate)
    pub fn new(name: &str, total: usize) -> Self {
        Self {
            name: name.to_string(),
            total,
            current: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
            quiet: std::env::var("FIGMINE_QUIET").is_ok(),
        }
    }

    /// Create a quiet reporter that doesn't output anything
    pub fn quiet(name: &str, total: usize) -> Self {
        Self {
            name: name.to_string(),
            total,
            current: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
            quiet: true,
        }
    }

    /// Increment progress by one unit
    pub fn inc(&self) {
        let new_value = self.current.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.quiet {
            self.print_progress(new_value);
        }
    }

    /// Print current progress
    fn print_progress(&self, current: usize) {
        let elapsed = self.start_time.elapsed();

        if self.total > 0 {
            let percent = (current as f64 / self.total as f64 * 100.0).min(100.0);
            print!(
                "\r{}: [{:>3.0}%] {}/{} ({} elapsed)",
                self.name,
                percent,
                current,
                self.total,
                Self::format_duration(elapsed),
            );
        } else {
            print!(
                "\r{}: {} ({} elapsed)",
                self.name,
                current,
                Self::format_duration(elapsed)
            );
        }

        if current >= self.total && self.total > 0 {
            println!();
        } else {
            use std::io::Write;
            let _ = std::io::stdout().flush();
        }
    }

    /// Format duration for display
    fn format_duration(duration: Duration) -> String {
        let secs = duration.as_secs();

        if secs >= 60 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}s", secs)
        }
    }

    /// Finish the progress and print final stats
    pub fn finish(&self) {
        let current = self.current.load(Ordering::SeqCst);
        let elapsed = self.start_time.elapsed();

        if !self.quiet && current > 0 {
            println!(
                "{}: completed {}/{} in {:?}",
                self.name,
                current,
                self.total.max(current),
                elapsed
            );
        }
    }

    /// Get the current progress count
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_reporter_creation() {
        let reporter = ProgressReporter::quiet("test", 100);
        assert_eq!(reporter.total, 100);
        assert!(reporter.quiet);
    }

    #[test]
    fn test_progress_reporter_increment() {
        let reporter = ProgressReporter::quiet("test", 100);
        reporter.inc();
        assert_eq!(reporter.current(), 1);

        reporter.inc();
        reporter.inc();
        assert_eq!(reporter.current(), 3);
    }

    #[test]
    fn test_progress_reporter_clone_shares_counter() {
        let reporter = ProgressReporter::quiet("test", 10);
        let clone = reporter.clone();
        clone.inc();
        reporter.inc();
        assert_eq!(reporter.current(), 2);
        assert_eq!(clone.current(), 2);
    }
}
