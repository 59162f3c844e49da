use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;

use crate::{HttpClient, HttpRequest};

use super::config::DriverConfig;
use super::error::{Error, Result};
use super::executor::execute_one;
use super::report::StatsReport;
use super::scenario::{self, Scenario};
use super::signal::StopSignal;
use super::stats::{RequestOutcome, RunStats};

/// Callback invoked once per settled request.
pub type RequestLogFn = Arc<dyn Fn(&RequestOutcome) + Send + Sync + 'static>;

/// Callback invoked for each periodic statistics report.
pub type ReportFn = Arc<dyn Fn(&StatsReport) + Send + Sync + 'static>;

/// How long the health probe waits before giving up on the target.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Grace period between a successful probe and the first batch.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Probe `{base_url}/health` before any load is generated.
///
/// Reachability and a success status are required. The body's `status` field
/// is informational and is returned for display ("unknown" when absent).
pub async fn check_target(client: &HttpClient, base_url: &str) -> Result<String> {
    let mut req = HttpRequest::get_owned(format!("{}/health", base_url.trim_end_matches('/')));
    req.timeout = Some(PROBE_TIMEOUT);

    let res = client.request(req).await?;
    if !(200..300).contains(&res.status) {
        return Err(Error::TargetUnhealthy(res.status));
    }

    let reported = serde_json::from_slice::<serde_json::Value>(&res.body)
        .ok()
        .and_then(|v| v.get("status").and_then(|s| s.as_str()).map(str::to_string));

    Ok(reported.unwrap_or_else(|| "unknown".to_string()))
}

/// Drive batches of concurrent requests against the target until the
/// configured duration elapses or a stop is requested, then return the final
/// report.
///
/// The stop signal is observed only between batches: a requested stop lets
/// every request of the current batch settle first, so the returned report is
/// complete.
pub async fn run_driver(
    cfg: DriverConfig,
    scenarios: Arc<[Scenario]>,
    client: Arc<HttpClient>,
    stats: Arc<RunStats>,
    stop: Arc<StopSignal>,
    on_request: Option<RequestLogFn>,
    on_report: Option<ReportFn>,
) -> Result<StatsReport> {
    if cfg.max_concurrent == 0 {
        return Err(Error::InvalidConcurrency);
    }
    if cfg.request_interval.is_zero() {
        return Err(Error::InvalidInterval);
    }

    // Give the target a moment after the probe before generating load.
    tokio::time::sleep(SETTLE_DELAY).await;

    // A deadline the clock cannot represent never elapses; such a run is
    // unbounded.
    let deadline = cfg.test_duration.and_then(|d| Instant::now().checked_add(d));
    let base_url: Arc<str> = Arc::from(cfg.base_url.as_str());

    let reporter = on_report.map(|on_report| {
        let stats = stats.clone();
        let period = cfg.stats_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; consume it so reports
            // start one full period into the run.
            interval.tick().await;

            loop {
                interval.tick().await;
                (on_report)(&StatsReport::collect(&stats));
            }
        })
    });

    loop {
        if stop.is_requested() {
            break;
        }
        if let Some(deadline) = deadline
            && Instant::now() >= deadline
        {
            break;
        }

        let mut handles = Vec::with_capacity(cfg.max_concurrent);
        for _ in 0..cfg.max_concurrent {
            let client = client.clone();
            let stats = stats.clone();
            let scenarios = scenarios.clone();
            let base_url = base_url.clone();
            let on_request = on_request.clone();

            handles.push(tokio::spawn(async move {
                let Some(scenario) = scenario::select(&scenarios) else {
                    return;
                };

                let outcome = execute_one(&client, &base_url, scenario, &stats).await;
                if let Some(on_request) = &on_request {
                    (on_request)(&outcome);
                }
            }));
        }

        // Barrier: every request of this batch settles before the next one
        // is scheduled.
        for handle in handles {
            handle.await?;
        }

        let pause = jittered_pause(cfg.request_interval);
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = stop.wait() => {}
        }
    }

    if let Some(handle) = reporter {
        handle.abort();
        let _ = handle.await;
    }

    Ok(StatsReport::collect(&stats))
}

/// Uniform pause in `[interval, 2 * interval]`, saturating at the far end.
fn jittered_pause(interval: Duration) -> Duration {
    interval.saturating_add(interval.mul_f64(fastrand::f64()))
}
