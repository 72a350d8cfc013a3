//! Control Channel - local line protocol between `lum` invocations.
//!
//! The first invocation becomes the *primary*: it binds [`Endpoint`] and
//! serves HTTP for every tracked file. Later invocations probe the
//! endpoint and hand their file over with `ADD` instead of starting a
//! second server.
//!
//! ```text
//! lum b.md ──connect──► control.sock ──ADD /abs/b.md──► Registry::add
//!          ◄──────────────── OK http://localhost:6333/?file=/abs/b.md
//! ```

mod client;
mod endpoint;
mod protocol;
mod server;


pub use client::{is_running, probe_and_add, stop};
pub use endpoint::{ControlListener, Endpoint};
pub use protocol::{Command, ParseError, Response};
pub use server::{ControlContext, serve};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    /// Nothing is listening; the caller may become primary
    #[error("no daemon running")]
    NoInstance,

    #[error("another lum instance already owns {}", .0.display())]
    AlreadyRunning(PathBuf),

    #[error("server error: {0}")]
    Server(String),

    #[error("unexpected response: {0}")]
    Protocol(String),

    #[error("control socket I/O error")]
    Io(#[from] io::Error),
}
