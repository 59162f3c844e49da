use std::time::Duration;

/// Tunables for one driver run.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Base URL of the target shop, without a trailing path.
    pub base_url: String,

    /// Base pause between batches. The actual pause is drawn uniformly from
    /// `[request_interval, 2 * request_interval]`.
    pub request_interval: Duration,

    /// Requests issued concurrently per batch.
    pub max_concurrent: usize,

    /// Total run duration. `None` runs until a stop is requested.
    pub test_duration: Option<Duration>,

    /// Error-rate fraction above which the final report carries a warning.
    pub error_threshold: f64,

    /// Cadence of periodic statistics reports.
    pub stats_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request_interval: Duration::from_millis(100),
            max_concurrent: 5,
            test_duration: None,
            error_threshold: 0.1,
            stats_interval: Duration::from_secs(10),
        }
    }
}
