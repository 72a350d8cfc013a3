//! Background mode: a detached copy of this executable runs as primary.

use std::fs::OpenOptions;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};

use super::Cli;
use crate::config::RuntimeDir;
use crate::control::{self, Endpoint};
use crate::debug;

/// How long the child gets to start accepting connections.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(3);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Start the detached primary and wait until its endpoint answers.
pub fn launch(cli: &Cli, runtime_dir: &RuntimeDir) -> Result<()> {
    let log_path = runtime_dir.log_path();
    let mut child = spawn_child(cli, &log_path)?;
    debug!("control"; "started daemon (pid {})", child.id());
    wait_for_endpoint(&runtime_dir.endpoint(), &mut child, &log_path)
}

fn spawn_child(cli: &Cli, log_path: &Path) -> Result<Child> {
    let exe = std::env::current_exe().context("failed to locate the lum executable")?;
    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let mut command = Command::new(exe);
    command.args(["--daemon-child", "--color", "never"]);
    if let Some(port) = cli.port {
        command.arg("--port").arg(port.to_string());
    }
    if let Some(config) = &cli.config {
        command.arg("--config").arg(std::path::absolute(config)?);
    }
    if cli.verbose {
        command.arg("--verbose");
    }

    command
        .stdin(Stdio::null())
        .stdout(log.try_clone()?)
        .stderr(log)
        // out of the terminal's process group, so Ctrl+C there does not reach it
        .process_group(0)
        .spawn()
        .context("failed to start daemon")
}

fn wait_for_endpoint(endpoint: &Endpoint, child: &mut Child, log_path: &Path) -> Result<()> {
    let deadline = Instant::now() + STARTUP_TIMEOUT;
    loop {
        if let Some(status) = child.try_wait()? {
            bail!(
                "daemon exited during startup ({status}), see {}",
                log_path.display()
            );
        }
        if control::is_running(endpoint) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!(
                "daemon did not start within {}s, see {}",
                STARTUP_TIMEOUT.as_secs(),
                log_path.display()
            );
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
