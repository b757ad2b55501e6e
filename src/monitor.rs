//! Progress reporting and performance tracking

use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tracing::info;

/// Performance snapshot for the recovery run
#[derive(Debug, Clone)]
pub struct PerformanceMetrics {
    /// Committed enumeration index
    pub processed: u128,
    /// Indices per second since the run started
    pub rate: f64,
    pub elapsed: Duration,
    pub estimated_remaining: Option<Duration>,
    pub completion_percentage: f64,
}

/// Configuration for the monitor
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Whether to render a progress bar on stderr
    pub show_progress_bar: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            show_progress_bar: true,
        }
    }
}

/// Tracks committed progress against the total search space.
///
/// Owned by the coordinator's collector; totals beyond `u64::MAX` are shown
/// saturated on the bar while the metrics stay exact.
#[derive(Debug)]
pub struct RecoveryMonitor {
    total: u128,
    processed: u128,
    start_time: Instant,
    progress_bar: Option<ProgressBar>,
}

impl RecoveryMonitor {
    pub fn new(total: u128, config: MonitorConfig) -> Self {
        let progress_bar = if config.show_progress_bar {
            let pb = ProgressBar::new(saturate(total));
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
                    )
                    .unwrap()
                    .progress_chars("#>-"),
            );
            pb.set_message("scanning candidates...");
            Some(pb)
        } else {
            None
        };

        Self {
            total,
            processed: 0,
            start_time: Instant::now(),
            progress_bar,
        }
    }

    /// Move the committed index forward (used on resume and per chunk)
    pub fn set_position(&mut self, committed: u128) {
        self.processed = committed;
        if let Some(pb) = &self.progress_bar {
            pb.set_position(saturate(committed));
            pb.set_message(utils::format_rate(self.metrics().rate));
        }
    }

    /// Announce a winning candidate without disturbing the bar
    pub fn record_match(&self, address: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.println(format!("match found: {address}"));
        }
        info!(address, "match found");
    }

    pub fn finish(&self, message: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message(message.to_string());
        }
    }

    pub fn processed(&self) -> u128 {
        self.processed
    }

    /// Current performance snapshot
    pub fn metrics(&self) -> PerformanceMetrics {
        let elapsed = self.start_time.elapsed();
        let rate = if elapsed.as_secs_f64() > 0.0 {
            self.processed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let estimated_remaining = if rate > 0.0 && self.total > self.processed {
            let remaining = (self.total - self.processed) as f64;
            Some(Duration::from_secs_f64(remaining / rate))
        } else {
            None
        };
        let completion_percentage = if self.total == 0 {
            100.0
        } else {
            (self.processed as f64 / self.total as f64) * 100.0
        };

        PerformanceMetrics {
            processed: self.processed,
            rate,
            elapsed,
            estimated_remaining,
            completion_percentage,
        }
    }
}

fn saturate(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Utility functions for monitoring
pub mod utils {
    use std::time::Duration;

    /// Format duration in human-readable form
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{hours}h {minutes}m {seconds}s")
        } else if minutes > 0 {
            format!("{minutes}m {seconds}s")
        } else {
            format!("{seconds}s")
        }
    }

    /// Format large numbers with thousands separators
    pub fn format_number(num: u128) -> String {
        let num_str = num.to_string();
        let mut result = String::new();

        for (i, c) in num_str.chars().rev().enumerate() {
            if i > 0 && i % 3 == 0 {
                result.push(',');
            }
            result.push(c);
        }

        result.chars().rev().collect()
    }

    /// Format a rate with appropriate units
    pub fn format_rate(rate: f64) -> String {
        if rate >= 1_000_000.0 {
            format!("{:.1}M/s", rate / 1_000_000.0)
        } else if rate >= 1_000.0 {
            format!("{:.1}K/s", rate / 1_000.0)
        } else {
            format!("{rate:.0}/s")
        }
    }
}
