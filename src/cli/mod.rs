//! Command-line flows.
//!
//! | Invocation     | Behavior                                               |
//! |----------------|--------------------------------------------------------|
//! | `lum FILE`     | hand FILE to the running instance, or serve it here    |
//! | `lum -d FILE`  | same, but a background instance is started if needed   |
//! | `lum -d`       | make sure a background instance runs                   |
//! | `lum -s`       | stop the running instance                              |

mod args;
mod daemon;
mod primary;

pub use args::{Cli, Mode};

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

use crate::config::{LumConfig, RuntimeDir};
use crate::control::{self, ControlError, Endpoint};
use crate::serve::index_url;
use crate::{debug, logger};

/// How long `--stop` waits for the socket to disappear.
const STOP_WAIT: Duration = Duration::from_secs(3);

/// Parse arguments and run the selected flow.
///
/// Help and version exit 0; argument errors exit 1.
pub fn run() -> Result<()> {
    let cli = Cli::try_parse().unwrap_or_else(|e| exit_with(&e));
    let mode = cli.mode().unwrap_or_else(|e| exit_with(&e));

    logger::init_color(cli.color);
    logger::set_verbose(cli.verbose);

    let config = LumConfig::load(cli.config.as_deref(), cli.port)?;
    let runtime_dir = RuntimeDir::resolve()?;
    debug!("control"; "runtime dir {}", runtime_dir.path().display());

    match mode {
        Mode::Stop => stop(&runtime_dir.endpoint()),
        Mode::Foreground(file) => foreground(&config, &runtime_dir.endpoint(), &file),
        Mode::Daemon(file) => background(&cli, &config, &runtime_dir, file.as_deref()),
        Mode::DaemonChild => {
            let endpoint = runtime_dir.endpoint();
            let listener = endpoint.bind()?;
            primary::run(&config, listener, None)
        }
    }
}

fn exit_with(err: &clap::Error) -> ! {
    let _ = err.print();
    std::process::exit(if err.use_stderr() { 1 } else { 0 })
}

fn stop(endpoint: &Endpoint) -> Result<()> {
    control::stop(endpoint, STOP_WAIT)?;
    println!("stopped");
    Ok(())
}

/// `lum FILE`: attach if a primary answers, otherwise become it.
fn foreground(config: &LumConfig, endpoint: &Endpoint, file: &Path) -> Result<()> {
    let path = resolve_file(file)?;
    if let Some(url) = attach(endpoint, &path)? {
        println!("{url}");
        return Ok(());
    }

    match endpoint.bind() {
        Ok(listener) => primary::run(config, listener, Some(&path)),
        // lost the race to another starting primary
        Err(ControlError::AlreadyRunning(_)) => {
            let url = attach(endpoint, &path)?.context("no daemon running")?;
            println!("{url}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// `lum -d [FILE]`: make sure a detached primary runs, then attach.
fn background(
    cli: &Cli,
    config: &LumConfig,
    runtime_dir: &RuntimeDir,
    file: Option<&Path>,
) -> Result<()> {
    let endpoint = runtime_dir.endpoint();
    let path = file.map(resolve_file).transpose()?;

    if !control::is_running(&endpoint) {
        daemon::launch(cli, runtime_dir)?;
    }

    match path {
        Some(path) => {
            let url = attach(&endpoint, &path)?.context("no daemon running")?;
            println!("{url}");
        }
        // the running instance does not report its port; assume the configured one
        None => println!("{}", index_url(config.serve.port)),
    }
    Ok(())
}

/// Hand `path` to a running primary. `None` when there is none.
fn attach(endpoint: &Endpoint, path: &Path) -> Result<Option<String>> {
    match control::probe_and_add(endpoint, path) {
        Ok(url) => Ok(Some(url)),
        Err(ControlError::NoInstance) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Absolute form of a FILE argument, which must exist.
fn resolve_file(file: &Path) -> Result<PathBuf> {
    let path = std::path::absolute(file)
        .with_context(|| format!("invalid path: {}", file.display()))?;
    if !path.exists() {
        bail!("file does not exist: {}", path.display());
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_file_makes_absolute() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, "# a").unwrap();

        assert_eq!(resolve_file(&path).unwrap(), path);

        let relative = resolve_file(Path::new("Cargo.toml")).unwrap();
        assert!(relative.is_absolute());
        assert!(relative.ends_with("Cargo.toml"));
    }

    #[test]
    fn test_resolve_file_missing() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.md");
        let err = resolve_file(&missing).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("file does not exist: {}", missing.display())
        );
    }

    #[test]
    fn test_attach_without_primary() {
        let dir = TempDir::new().unwrap();
        let endpoint = Endpoint::new(dir.path().join("control.sock"), dir.path().join("control.lock"));
        assert!(attach(&endpoint, &dir.path().join("a.md")).unwrap().is_none());
    }

    #[test]
    fn test_stop_without_primary() {
        let dir = TempDir::new().unwrap();
        let endpoint = Endpoint::new(dir.path().join("control.sock"), dir.path().join("control.lock"));
        assert_eq!(stop(&endpoint).unwrap_err().to_string(), "no daemon running");
    }
}
