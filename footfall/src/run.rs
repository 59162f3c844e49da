use std::sync::Arc;

use anyhow::Context as _;

use footfall_core::HttpClient;
use footfall_core::driver::{self, RunStats, Scenario, StatsReport, StopSignal, builtin_scenarios};

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output;

pub async fn run(args: RunArgs) -> anyhow::Result<ExitCode> {
    let out = output::formatter(args.output);
    let cfg = args.driver_config();

    let client = Arc::new(HttpClient::default());
    let stats = Arc::new(RunStats::new());
    let stop = Arc::new(StopSignal::new());
    // The handler covers the probe window as well as the run.
    spawn_signal_handler(stop.clone());

    let probe = tokio::select! {
        res = driver::check_target(&client, &cfg.base_url) => res,
        _ = stop.wait() => {
            // Interrupted before any load was generated; the final summary
            // still prints exactly once.
            out.print_summary(&StatsReport::collect(&stats), cfg.error_threshold)?;
            return Ok(ExitCode::Success);
        }
    };

    let health = match probe {
        Ok(health) => health,
        Err(err) => {
            eprintln!("{err}");
            eprintln!("make sure the shop is reachable at {}", cfg.base_url);
            return Ok(ExitCode::Failure);
        }
    };

    out.print_header(&cfg, &health);

    let scenarios: Arc<[Scenario]> = Arc::from(builtin_scenarios().to_vec());

    // `cfg` moves into the driver; the threshold is only needed for the summary.
    let error_threshold = cfg.error_threshold;

    let summary = driver::run_driver(
        cfg,
        scenarios,
        client,
        stats,
        stop,
        out.request_line(),
        out.report_block(),
    )
    .await
    .context("load run failed")?;

    out.print_summary(&summary, error_threshold)?;

    Ok(ExitCode::Success)
}

/// Requests a cooperative stop on the first SIGINT or SIGTERM. In-flight
/// requests drain and the final summary still prints.
fn spawn_signal_handler(stop: Arc<StopSignal>) {
    tokio::spawn(async move {
        shutdown_signal().await;
        eprintln!("interrupt received, draining in-flight requests");
        stop.request();
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            // No handler could be installed; wait on ctrl_c alone.
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
