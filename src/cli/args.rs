//! Command-line interface definitions.

use clap::error::ErrorKind;
use clap::{ColorChoice, CommandFactory, Parser};
use std::path::PathBuf;

/// Live Markdown preview server
#[derive(Parser, Debug, Clone)]
#[command(name = "lum", version, about, long_about = None)]
pub struct Cli {
    /// Markdown file to preview
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// Port number to listen on [default: 6333]
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Run in the background (or hand FILE to the running instance)
    #[arg(short, long, conflicts_with = "stop")]
    pub daemon: bool,

    /// Stop the running instance
    #[arg(short, long)]
    pub stop: bool,

    /// Print debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path [default: <config-dir>/lum/config.toml]
    #[arg(short = 'C', long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Run as the detached primary started by `--daemon`
    #[arg(long, hide = true)]
    pub daemon_child: bool,
}

/// What this invocation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Ask the running instance to exit
    Stop,
    /// Make sure a background instance runs, optionally tracking a file
    Daemon(Option<PathBuf>),
    /// The background instance itself
    DaemonChild,
    /// Attach to the running instance, or serve in the foreground
    Foreground(PathBuf),
}

impl Cli {
    pub fn mode(&self) -> Result<Mode, clap::Error> {
        if self.daemon_child {
            return Ok(Mode::DaemonChild);
        }
        if self.stop {
            return Ok(Mode::Stop);
        }
        if self.daemon {
            return Ok(Mode::Daemon(self.file.clone()));
        }
        match &self.file {
            Some(file) => Ok(Mode::Foreground(file.clone())),
            None => Err(Cli::command().error(
                ErrorKind::MissingRequiredArgument,
                "a FILE is required unless --daemon or --stop is given",
            )),
        }
    }
}
