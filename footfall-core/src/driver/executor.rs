use std::time::Instant;

use crate::{HttpClient, HttpResponse};

use super::scenario::Scenario;
use super::stats::{RequestOutcome, RunStats};

/// Issue one request for `scenario` and fold the outcome into `stats`.
///
/// Failures are absorbed into the outcome: a refused connection or an error
/// status never propagates, so a single bad request cannot end the run.
pub async fn execute_one(
    client: &HttpClient,
    base_url: &str,
    scenario: &Scenario,
    stats: &RunStats,
) -> RequestOutcome {
    let request = scenario.kind.build_request(base_url);
    let started = Instant::now();
    let result = client.request(request).await;
    let duration = started.elapsed();

    let outcome = match result {
        Ok(res) if is_success(res.status) => RequestOutcome {
            scenario: scenario.name,
            succeeded: true,
            duration,
            status: Some(res.status),
            error: None,
        },
        Ok(res) => RequestOutcome {
            scenario: scenario.name,
            succeeded: false,
            duration,
            status: Some(res.status),
            error: Some(failure_message(&res)),
        },
        Err(err) => RequestOutcome {
            scenario: scenario.name,
            succeeded: false,
            duration,
            status: None,
            error: Some(err.to_string()),
        },
    };

    stats.record(&outcome);
    outcome
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Prefer the target's own `error` field when the body is JSON; otherwise
/// fall back to a generic status message.
fn failure_message(res: &HttpResponse) -> String {
    let from_body = serde_json::from_slice::<serde_json::Value>(&res.body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string));

    from_body.unwrap_or_else(|| format!("request failed with status {}", res.status))
}
