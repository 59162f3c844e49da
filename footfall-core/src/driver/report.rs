use std::time::Duration;

use super::stats::{ErrorRecord, LatencySnapshot, RunStats};

/// How many retained failures a single report displays.
const REPORT_ERROR_WINDOW: usize = 5;

/// Point-in-time view of a run. Safe to take while requests are in flight;
/// the driver also returns one as the final summary.
#[derive(Debug, Clone)]
pub struct StatsReport {
    pub elapsed: Duration,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub requests_per_sec: f64,
    /// Fraction of requests that failed; zero while nothing has completed.
    pub error_rate: f64,
    pub recent_errors: Vec<ErrorRecord>,
    pub latency: Option<LatencySnapshot>,
}

impl StatsReport {
    pub fn collect(stats: &RunStats) -> Self {
        let elapsed = stats.elapsed();
        let total = stats.total_requests();
        let failed = stats.failed_requests();

        Self {
            elapsed,
            total_requests: total,
            successful_requests: stats.successful_requests(),
            failed_requests: failed,
            requests_per_sec: requests_per_sec(total, elapsed),
            error_rate: error_rate(failed, total),
            recent_errors: stats.recent_errors(REPORT_ERROR_WINDOW),
            latency: stats.latency_snapshot(),
        }
    }

    /// Advisory check against the configured error threshold (strictly above).
    #[must_use]
    pub fn exceeds_error_threshold(&self, threshold: f64) -> bool {
        self.error_rate > threshold
    }
}

fn requests_per_sec(total: u64, elapsed: Duration) -> f64 {
    (total as f64) / elapsed.as_secs_f64().max(1e-9)
}

fn error_rate(failed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (failed as f64) / (total as f64)
    }
}
