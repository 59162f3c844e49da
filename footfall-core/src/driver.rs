mod config;
mod error;
mod executor;
mod report;
mod run;
mod scenario;
mod signal;
mod stats;

pub use config::DriverConfig;
pub use error::{Error, Result};
pub use executor::execute_one;
pub use report::StatsReport;
pub use run::{ReportFn, RequestLogFn, check_target, run_driver};
pub use scenario::{Scenario, ScenarioKind, builtin_scenarios, pick, select};
pub use signal::StopSignal;
pub use stats::{ERROR_LOG_CAPACITY, ErrorRecord, LatencySnapshot, RequestOutcome, RunStats};
