use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;

use footfall_core::HttpClient;
use footfall_core::driver::{
    DriverConfig, Error, ReportFn, RunStats, Scenario, ScenarioKind, StatsReport, StopSignal,
    check_target, execute_one, run_driver,
};
use footfall_shop::{FaultProfile, Product, ShopServer, ShopState};

fn browse_only() -> Arc<[Scenario]> {
    Arc::from(vec![Scenario {
        name: "Browse Products",
        weight: 1.0,
        kind: ScenarioKind::BrowseProducts,
    }])
}

fn zero_stock_catalog() -> Vec<Product> {
    (1..=5)
        .map(|id| Product {
            id,
            name: format!("Item {id}"),
            price: 10.0,
            stock: 0,
            category: "test".to_string(),
        })
        .collect()
}

/// A local url with nothing listening behind it.
fn dead_url() -> anyhow::Result<String> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

#[tokio::test]
async fn check_target_reports_the_health_status() -> anyhow::Result<()> {
    let server = ShopServer::start_with(FaultProfile::none()).await?;
    let client = HttpClient::default();

    let status = check_target(&client, server.base_url()).await?;
    anyhow::ensure!(status == "healthy", "unexpected health status: {status}");

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn check_target_rejects_an_unreachable_target() -> anyhow::Result<()> {
    let client = HttpClient::default();

    let result = check_target(&client, &dead_url()?).await;
    anyhow::ensure!(
        matches!(result, Err(Error::TargetUnavailable(_))),
        "expected a target-unavailable error, got {result:?}"
    );

    Ok(())
}

#[tokio::test]
async fn a_successful_request_records_a_success_outcome() -> anyhow::Result<()> {
    let server = ShopServer::start_with(FaultProfile::none()).await?;

    let client = HttpClient::default();
    let stats = RunStats::new();
    let scenario = Scenario {
        name: "Browse Products",
        weight: 1.0,
        kind: ScenarioKind::BrowseProducts,
    };

    let outcome = execute_one(&client, server.base_url(), &scenario, &stats).await;

    anyhow::ensure!(outcome.succeeded, "outcome failed: {:?}", outcome.error);
    anyhow::ensure!(outcome.status == Some(200));
    anyhow::ensure!(outcome.error.is_none());
    anyhow::ensure!(stats.total_requests() == 1);
    anyhow::ensure!(stats.successful_requests() == 1);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn target_validation_failures_surface_as_failed_outcomes() -> anyhow::Result<()> {
    let state = ShopState::with_products(FaultProfile::none(), zero_stock_catalog());
    let server = ShopServer::start_with_state(state).await?;

    let client = HttpClient::default();
    let stats = RunStats::new();
    let scenario = Scenario {
        name: "Make Purchase",
        weight: 1.0,
        kind: ScenarioKind::MakePurchase,
    };

    let outcome = execute_one(&client, server.base_url(), &scenario, &stats).await;

    anyhow::ensure!(!outcome.succeeded);
    anyhow::ensure!(outcome.status == Some(400), "unexpected status: {:?}", outcome.status);
    let message = outcome.error.clone().unwrap_or_default();
    anyhow::ensure!(message == "Insufficient stock", "unexpected error message: {message}");

    anyhow::ensure!(stats.failed_requests() == 1);
    let errors = stats.recent_errors(5);
    anyhow::ensure!(errors.len() == 1);
    anyhow::ensure!(errors[0].scenario == "Make Purchase");
    anyhow::ensure!(errors[0].status == Some(400));

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn one_batch_settles_before_the_driver_moves_on() -> anyhow::Result<()> {
    let server = ShopServer::start_with(FaultProfile::none()).await?;

    // The deadline expires during the first inter-batch pause, so exactly one
    // batch of five runs.
    let cfg = DriverConfig {
        base_url: server.base_url().to_string(),
        request_interval: Duration::from_millis(500),
        max_concurrent: 5,
        test_duration: Some(Duration::from_millis(150)),
        ..DriverConfig::default()
    };

    let stats = Arc::new(RunStats::new());
    let report = run_driver(
        cfg,
        browse_only(),
        Arc::new(HttpClient::default()),
        stats.clone(),
        Arc::new(StopSignal::new()),
        None,
        None,
    )
    .await?;

    anyhow::ensure!(
        report.total_requests == 5,
        "expected one full batch, got {} requests",
        report.total_requests
    );
    anyhow::ensure!(report.successful_requests == 5);
    anyhow::ensure!(report.failed_requests == 0);
    anyhow::ensure!(server.stats().requests_total() == 5);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn a_requested_stop_halts_the_run() -> anyhow::Result<()> {
    let server = ShopServer::start_with(FaultProfile::none()).await?;

    let cfg = DriverConfig {
        base_url: server.base_url().to_string(),
        request_interval: Duration::from_millis(50),
        max_concurrent: 2,
        test_duration: None,
        ..DriverConfig::default()
    };

    let stats = Arc::new(RunStats::new());
    let stop = Arc::new(StopSignal::new());

    let driver = tokio::spawn(run_driver(
        cfg,
        browse_only(),
        Arc::new(HttpClient::default()),
        stats.clone(),
        stop.clone(),
        None,
        None,
    ));

    // Past the settle delay and at least one batch into the run.
    tokio::time::sleep(Duration::from_millis(1400)).await;
    stop.request();

    let joined = tokio::time::timeout(Duration::from_secs(10), driver)
        .await
        .context("driver did not observe the stop request")?;
    let report = joined??;

    anyhow::ensure!(
        report.total_requests >= 2,
        "expected at least one batch, got {} requests",
        report.total_requests
    );
    anyhow::ensure!(report.total_requests == report.successful_requests + report.failed_requests);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn an_oversized_duration_runs_as_unbounded() -> anyhow::Result<()> {
    let server = ShopServer::start_with(FaultProfile::none()).await?;

    // A deadline the clock cannot represent behaves like no deadline at all;
    // the run still stops cooperatively.
    let cfg = DriverConfig {
        base_url: server.base_url().to_string(),
        request_interval: Duration::from_millis(50),
        max_concurrent: 2,
        test_duration: Some(Duration::from_secs(u64::MAX)),
        ..DriverConfig::default()
    };

    let stats = Arc::new(RunStats::new());
    let stop = Arc::new(StopSignal::new());

    let driver = tokio::spawn(run_driver(
        cfg,
        browse_only(),
        Arc::new(HttpClient::default()),
        stats.clone(),
        stop.clone(),
        None,
        None,
    ));

    // Past the settle delay and at least one batch into the run.
    tokio::time::sleep(Duration::from_millis(1400)).await;
    stop.request();

    let joined = tokio::time::timeout(Duration::from_secs(10), driver)
        .await
        .context("driver did not observe the stop request")?;
    let report = joined??;

    anyhow::ensure!(
        report.total_requests >= 2,
        "expected at least one batch, got {} requests",
        report.total_requests
    );

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn the_periodic_reporter_fires_on_its_cadence() -> anyhow::Result<()> {
    let server = ShopServer::start_with(FaultProfile::none()).await?;

    let cfg = DriverConfig {
        base_url: server.base_url().to_string(),
        request_interval: Duration::from_millis(300),
        max_concurrent: 1,
        test_duration: Some(Duration::from_millis(900)),
        stats_interval: Duration::from_millis(200),
        ..DriverConfig::default()
    };

    let seen: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
    let totals = seen.clone();
    let on_report: ReportFn = Arc::new(move |report: &StatsReport| {
        totals
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(report.total_requests);
    });

    run_driver(
        cfg,
        browse_only(),
        Arc::new(HttpClient::default()),
        Arc::new(RunStats::new()),
        Arc::new(StopSignal::new()),
        None,
        Some(on_report),
    )
    .await?;

    let totals = seen
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    anyhow::ensure!(
        totals.len() >= 2,
        "expected at least two periodic reports, got {}",
        totals.len()
    );
    anyhow::ensure!(
        totals.windows(2).all(|w| w[0] <= w[1]),
        "report totals went backwards: {totals:?}"
    );

    server.shutdown().await;
    Ok(())
}
