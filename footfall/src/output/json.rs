use std::io::Write as _;
use std::sync::Arc;

use serde::Serialize;

use footfall_core::driver::{
    DriverConfig, ErrorRecord, LatencySnapshot, ReportFn, RequestLogFn, RequestOutcome, StatsReport,
};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _cfg: &DriverConfig, _health: &str) {}

    fn request_line(&self) -> Option<RequestLogFn> {
        Some(Arc::new(move |outcome| {
            let line = build_request_line(outcome);
            emit_json_line(&line);
        }))
    }

    fn report_block(&self) -> Option<ReportFn> {
        Some(Arc::new(move |report| {
            let line = build_stats_line(report);
            emit_json_line(&line);
        }))
    }

    fn print_summary(&self, report: &StatsReport, error_threshold: f64) -> anyhow::Result<()> {
        let line = build_summary_line(report, error_threshold);
        emit_json_line(&line);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonRequestLine {
    pub kind: &'static str,
    pub scenario: &'static str,
    pub succeeded: bool,
    pub status: Option<u16>,
    pub duration_ms: f64,
    pub error: Option<String>,
}

fn build_request_line(outcome: &RequestOutcome) -> JsonRequestLine {
    JsonRequestLine {
        kind: "request",
        scenario: outcome.scenario,
        succeeded: outcome.succeeded,
        status: outcome.status,
        duration_ms: outcome.duration.as_secs_f64() * 1_000.0,
        error: outcome.error.clone(),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonStatsLine {
    pub kind: &'static str,
    pub elapsed_secs: f64,

    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,

    pub requests_per_sec: f64,
    pub error_rate: f64,

    pub latency: Option<JsonLatencySummary>,
    pub recent_errors: Vec<JsonErrorLine>,
}

fn build_stats_line(report: &StatsReport) -> JsonStatsLine {
    JsonStatsLine {
        kind: "stats",
        elapsed_secs: report.elapsed.as_secs_f64(),
        total_requests: report.total_requests,
        successful_requests: report.successful_requests,
        failed_requests: report.failed_requests,
        requests_per_sec: report.requests_per_sec,
        error_rate: report.error_rate,
        latency: report.latency.as_ref().map(build_latency),
        recent_errors: build_errors(&report.recent_errors),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub elapsed_secs: f64,

    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,

    pub requests_per_sec: f64,
    pub error_rate: f64,
    pub error_threshold: f64,
    pub threshold_exceeded: bool,

    pub latency: Option<JsonLatencySummary>,
    pub recent_errors: Vec<JsonErrorLine>,
}

fn build_summary_line(report: &StatsReport, error_threshold: f64) -> JsonSummaryLine {
    JsonSummaryLine {
        kind: "summary",
        elapsed_secs: report.elapsed.as_secs_f64(),
        total_requests: report.total_requests,
        successful_requests: report.successful_requests,
        failed_requests: report.failed_requests,
        requests_per_sec: report.requests_per_sec,
        error_rate: report.error_rate,
        error_threshold,
        threshold_exceeded: report.exceeds_error_threshold(error_threshold),
        latency: report.latency.as_ref().map(build_latency),
        recent_errors: build_errors(&report.recent_errors),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonLatencySummary {
    pub count: u64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub max_ms: u64,
}

fn build_latency(snapshot: &LatencySnapshot) -> JsonLatencySummary {
    JsonLatencySummary {
        count: snapshot.count,
        mean_ms: snapshot.mean_ms,
        p50_ms: snapshot.p50_ms,
        p95_ms: snapshot.p95_ms,
        max_ms: snapshot.max_ms,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonErrorLine {
    pub scenario: &'static str,
    pub message: String,
    pub status: Option<u16>,
    pub at: String,
}

fn build_errors(errors: &[ErrorRecord]) -> Vec<JsonErrorLine> {
    errors
        .iter()
        .map(|e| JsonErrorLine {
            scenario: e.scenario,
            message: e.message.clone(),
            status: e.status,
            at: humantime::format_rfc3339_millis(e.at).to_string(),
        })
        .collect()
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
