#![cfg(unix)]

use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::Context as _;

use footfall_shop::{FaultProfile, ShopServer};

#[tokio::test]
async fn sigint_drains_and_still_prints_one_summary() -> anyhow::Result<()> {
    let server = ShopServer::start_with(FaultProfile::none())
        .await
        .context("start shop server")?;
    let target = server.base_url().to_string();
    let exe = env!("CARGO_BIN_EXE_footfall");

    // No --duration: the run is unbounded until a signal arrives.
    let child = Command::new(exe)
        .arg("run")
        .arg("--target")
        .arg(&target)
        .arg("--interval")
        .arg("50ms")
        .arg("--concurrency")
        .arg("2")
        .arg("--output")
        .arg("json")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("spawn footfall binary")?;

    // Past the settle delay and at least a few batches into the run.
    tokio::time::sleep(Duration::from_millis(2_000)).await;

    let pid = child.id();
    let kill = tokio::task::spawn_blocking(move || {
        Command::new("kill").arg("-INT").arg(pid.to_string()).status()
    })
    .await
    .context("spawn_blocking join")?
    .context("send SIGINT")?;
    anyhow::ensure!(kill.success(), "kill -INT {pid} failed");

    let wait = tokio::task::spawn_blocking(move || child.wait_with_output());
    let output = tokio::time::timeout(Duration::from_secs(15), wait)
        .await
        .context("footfall did not exit after SIGINT")?
        .context("spawn_blocking join")?
        .context("wait for footfall binary")?;

    server.shutdown().await;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    anyhow::ensure!(
        output.status.code() == Some(0),
        "an interrupted run still exits cleanly, got {}\nstdout:\n{stdout}\nstderr:\n{stderr}",
        output.status
    );
    anyhow::ensure!(
        stderr.contains("interrupt received"),
        "expected the interrupt notice on stderr\nstderr:\n{stderr}"
    );

    let requests = stdout
        .lines()
        .filter(|l| l.contains("\"kind\":\"request\""))
        .count();
    let summaries = stdout
        .lines()
        .filter(|l| l.contains("\"kind\":\"summary\""))
        .count();

    anyhow::ensure!(
        requests > 0,
        "expected request lines before the interrupt\nstdout:\n{stdout}"
    );
    anyhow::ensure!(
        summaries == 1,
        "expected exactly one summary line, got {summaries}\nstdout:\n{stdout}"
    );

    Ok(())
}

#[tokio::test]
async fn sigint_during_the_probe_exits_cleanly_with_an_empty_summary() -> anyhow::Result<()> {
    // Accepts connections but never answers, so the health probe stalls
    // until its timeout.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").context("bind silent listener")?;
    let target = format!("http://{}", listener.local_addr().context("listener addr")?);
    let exe = env!("CARGO_BIN_EXE_footfall");

    let child = Command::new(exe)
        .arg("run")
        .arg("--target")
        .arg(&target)
        .arg("--output")
        .arg("json")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("spawn footfall binary")?;

    // Well inside the probe window; the probe waits five seconds.
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let pid = child.id();
    let kill = tokio::task::spawn_blocking(move || {
        Command::new("kill").arg("-INT").arg(pid.to_string()).status()
    })
    .await
    .context("spawn_blocking join")?
    .context("send SIGINT")?;
    anyhow::ensure!(kill.success(), "kill -INT {pid} failed");

    let wait = tokio::task::spawn_blocking(move || child.wait_with_output());
    let output = tokio::time::timeout(Duration::from_secs(15), wait)
        .await
        .context("footfall did not exit after SIGINT")?
        .context("spawn_blocking join")?
        .context("wait for footfall binary")?;

    drop(listener);

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    anyhow::ensure!(
        output.status.code() == Some(0),
        "an interrupt during the probe still exits cleanly, got {}\nstdout:\n{stdout}\nstderr:\n{stderr}",
        output.status
    );
    anyhow::ensure!(
        stderr.contains("interrupt received"),
        "expected the interrupt notice on stderr\nstderr:\n{stderr}"
    );

    let summaries: Vec<&str> = stdout
        .lines()
        .filter(|l| l.contains("\"kind\":\"summary\""))
        .collect();
    anyhow::ensure!(
        summaries.len() == 1,
        "expected exactly one summary line, got {}\nstdout:\n{stdout}",
        summaries.len()
    );
    anyhow::ensure!(
        summaries[0].contains("\"total\":0"),
        "no load ran before the interrupt\nstdout:\n{stdout}"
    );

    Ok(())
}
