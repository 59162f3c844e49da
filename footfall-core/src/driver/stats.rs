use hdrhistogram::Histogram;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

/// How many recent failures are retained. Older entries are discarded so an
/// unbounded run cannot grow the error log without limit.
pub const ERROR_LOG_CAPACITY: usize = 100;

/// Outcome of a single executed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub scenario: &'static str,
    pub succeeded: bool,
    pub duration: Duration,
    /// HTTP status, or `None` when the request failed before a response.
    pub status: Option<u16>,
    pub error: Option<String>,
}

/// One retained failure, as rendered in the recent-errors section of reports.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub scenario: &'static str,
    pub message: String,
    pub status: Option<u16>,
    pub at: SystemTime,
}

#[derive(Debug, Clone, Copy)]
pub struct LatencySnapshot {
    pub count: u64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub max_ms: u64,
}

#[derive(Debug)]
pub struct RunStats {
    started: Instant,
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    recent_errors: Mutex<VecDeque<ErrorRecord>>,
    latency_us: Mutex<Histogram<u64>>,
}

impl Default for RunStats {
    fn default() -> Self {
        // Track up to 60s in microseconds (with 3 sigfigs).
        let latency_us = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)
            .unwrap_or_else(|err| panic!("failed to init histogram: {err}"));

        Self {
            started: Instant::now(),
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            recent_errors: Mutex::new(VecDeque::with_capacity(ERROR_LOG_CAPACITY)),
            latency_us: Mutex::new(latency_us),
        }
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one settled request into the aggregate. Called exactly once per
    /// outcome, by the executor.
    pub fn record(&self, outcome: &RequestOutcome) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if outcome.succeeded {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
            self.push_error(ErrorRecord {
                scenario: outcome.scenario,
                message: outcome
                    .error
                    .clone()
                    .unwrap_or_else(|| "request failed".to_string()),
                status: outcome.status,
                at: SystemTime::now(),
            });
        }

        self.record_latency(outcome.duration);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn successful_requests(&self) -> u64 {
        self.successful_requests.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Last `limit` retained failures, oldest first.
    pub fn recent_errors(&self, limit: usize) -> Vec<ErrorRecord> {
        let log = self
            .recent_errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let skip = log.len().saturating_sub(limit);
        log.iter().skip(skip).cloned().collect()
    }

    pub fn retained_error_count(&self) -> usize {
        let log = self
            .recent_errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        log.len()
    }

    pub fn latency_snapshot(&self) -> Option<LatencySnapshot> {
        let h = self
            .latency_us
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        #[allow(clippy::len_zero)]
        if h.len() == 0 {
            return None;
        }

        Some(LatencySnapshot {
            count: h.len(),
            mean_ms: h.mean() / 1000.0,
            p50_ms: h.value_at_quantile(0.50) as f64 / 1000.0,
            p95_ms: h.value_at_quantile(0.95) as f64 / 1000.0,
            max_ms: h.max() / 1000,
        })
    }

    fn push_error(&self, record: ErrorRecord) {
        let mut log = self
            .recent_errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if log.len() == ERROR_LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back(record);
    }

    fn record_latency(&self, elapsed: Duration) {
        let us = elapsed.as_micros();
        if us == 0 {
            return;
        }

        let mut h = self
            .latency_us
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _ = h.record(us as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_outcome(ms: u64) -> RequestOutcome {
        RequestOutcome {
            scenario: "Browse Products",
            succeeded: true,
            duration: Duration::from_millis(ms),
            status: Some(200),
            error: None,
        }
    }

    fn failed_outcome(message: &str) -> RequestOutcome {
        RequestOutcome {
            scenario: "Make Purchase",
            succeeded: false,
            duration: Duration::from_millis(3),
            status: Some(400),
            error: Some(message.to_string()),
        }
    }

    #[test]
    fn record_partitions_successes_and_failures() {
        let stats = RunStats::new();

        for _ in 0..3 {
            stats.record(&ok_outcome(5));
        }
        stats.record(&failed_outcome("Insufficient stock"));
        stats.record(&failed_outcome("Payment processing failed"));

        assert_eq!(stats.total_requests(), 5);
        assert_eq!(stats.successful_requests(), 3);
        assert_eq!(stats.failed_requests(), 2);
        assert_eq!(stats.retained_error_count(), 2);
    }

    #[test]
    fn error_log_stays_within_capacity() {
        let stats = RunStats::new();

        for i in 0..(ERROR_LOG_CAPACITY + 25) {
            stats.record(&failed_outcome(&format!("err {i}")));
        }

        assert_eq!(stats.retained_error_count(), ERROR_LOG_CAPACITY);

        // The oldest 25 entries were evicted.
        let errors = stats.recent_errors(ERROR_LOG_CAPACITY);
        assert_eq!(errors.len(), ERROR_LOG_CAPACITY);
        assert_eq!(errors[0].message, "err 25");
    }

    #[test]
    fn recent_errors_returns_the_trailing_window() {
        let stats = RunStats::new();

        for i in 0..8 {
            stats.record(&failed_outcome(&format!("err {i}")));
        }

        let window = stats.recent_errors(5);
        assert_eq!(window.len(), 5);
        assert_eq!(window[0].message, "err 3");
        assert_eq!(window[4].message, "err 7");
    }

    #[test]
    fn error_records_carry_scenario_and_status() {
        let stats = RunStats::new();
        stats.record(&failed_outcome("Insufficient stock"));

        let errors = stats.recent_errors(5);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].scenario, "Make Purchase");
        assert_eq!(errors[0].status, Some(400));
        assert_eq!(errors[0].message, "Insufficient stock");
    }

    #[test]
    fn latency_snapshot_is_none_without_samples() {
        let stats = RunStats::new();
        assert!(stats.latency_snapshot().is_none());
    }

    #[test]
    fn latency_snapshot_reflects_recorded_durations() {
        let stats = RunStats::new();
        stats.record(&ok_outcome(5));

        let snapshot = match stats.latency_snapshot() {
            Some(s) => s,
            None => panic!("expected a snapshot after one sample"),
        };

        assert_eq!(snapshot.count, 1);
        assert_eq!(snapshot.max_ms, 5);
        assert!((snapshot.p50_ms - 5.0).abs() < 0.1, "p50 {}", snapshot.p50_ms);
    }
}
