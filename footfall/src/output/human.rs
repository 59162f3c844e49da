use std::fmt::Write as _;
use std::sync::Arc;

mod format;

use footfall_core::driver::{DriverConfig, ReportFn, RequestLogFn, RequestOutcome, StatsReport};

use format::{format_duration_single, format_millis, format_percent, format_rate};

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput;

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, cfg: &DriverConfig, health: &str) {
        println!("target: {} (health: {health})", cfg.base_url);
        println!(
            "profile: concurrency={} interval={} duration={}",
            cfg.max_concurrent,
            format_duration_single(cfg.request_interval),
            cfg.test_duration
                .map_or_else(|| "unbounded".to_string(), format_duration_single),
        );
        println!();
    }

    fn request_line(&self) -> Option<RequestLogFn> {
        Some(Arc::new(|outcome| println!("{}", render_request(outcome))))
    }

    fn report_block(&self) -> Option<ReportFn> {
        Some(Arc::new(|report| print!("{}", render_report(report, "stats"))))
    }

    fn print_summary(&self, report: &StatsReport, error_threshold: f64) -> anyhow::Result<()> {
        print!("{}", render_report(report, "summary"));

        if report.exceeds_error_threshold(error_threshold) {
            eprintln!(
                "warning: error rate {} exceeds threshold {}",
                format_percent(report.error_rate),
                format_percent(error_threshold)
            );
        }

        Ok(())
    }
}

fn render_request(outcome: &RequestOutcome) -> String {
    let status = outcome
        .status
        .map_or_else(|| "NETWORK".to_string(), |s| s.to_string());

    let mut line = format!(
        "{}: status={status} duration={}",
        outcome.scenario,
        format_duration_single(outcome.duration)
    );

    if let Some(error) = &outcome.error {
        write!(&mut line, " error=\"{error}\"").ok();
    }

    line
}

fn render_report(report: &StatsReport, heading: &str) -> String {
    let mut out = String::new();

    out.push_str(heading);
    out.push('\n');
    writeln!(
        &mut out,
        "  elapsed: {}",
        format_duration_single(report.elapsed)
    )
    .ok();
    writeln!(
        &mut out,
        "  requests: {} (ok {}, failed {})",
        report.total_requests, report.successful_requests, report.failed_requests
    )
    .ok();
    writeln!(
        &mut out,
        "  rates: rps={} error_rate={}",
        format_rate(report.requests_per_sec),
        format_percent(report.error_rate)
    )
    .ok();

    if let Some(latency) = &report.latency {
        writeln!(
            &mut out,
            "  latency = p50={} p95={} mean={} max={} (n={})",
            format_millis(latency.p50_ms),
            format_millis(latency.p95_ms),
            format_millis(latency.mean_ms),
            format_millis(latency.max_ms as f64),
            latency.count
        )
        .ok();
    } else {
        out.push_str("  latency: n/a\n");
    }

    if !report.recent_errors.is_empty() {
        out.push_str("  recent errors:\n");
        for e in &report.recent_errors {
            let when = humantime::format_rfc3339_seconds(e.at);
            match e.status {
                Some(status) => {
                    writeln!(
                        &mut out,
                        "    [{when}] {}: {} (status {status})",
                        e.scenario, e.message
                    )
                    .ok();
                }
                None => {
                    writeln!(&mut out, "    [{when}] {}: {}", e.scenario, e.message).ok();
                }
            }
        }
    }

    out.push('\n');
    out
}
