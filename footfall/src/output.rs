mod human;
mod json;

use footfall_core::driver::{DriverConfig, ReportFn, RequestLogFn, StatsReport};

use crate::cli::OutputFormat;

/// Renders driver progress and results in one of the supported output formats.
pub(crate) trait OutputFormatter: Send + Sync {
    /// Called once before the run starts, after the health probe succeeded.
    fn print_header(&self, cfg: &DriverConfig, health: &str);

    /// Per-request callback handed to the driver, if this format logs requests.
    fn request_line(&self) -> Option<RequestLogFn>;

    /// Periodic-report callback handed to the driver, if this format emits them.
    fn report_block(&self) -> Option<ReportFn>;

    /// Called exactly once with the final report.
    fn print_summary(&self, report: &StatsReport, error_threshold: f64) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
