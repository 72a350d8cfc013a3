//! Control client: used by a new invocation to reach the primary.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::{Duration, Instant};

use super::ControlError;
use super::endpoint::Endpoint;
use super::protocol::{Command, Response};

/// Upper bound for the primary to answer (the initial render happens first).
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Ask a running primary to track `path`; returns its URL.
///
/// [`ControlError::NoInstance`] means the caller should become primary.
pub fn probe_and_add(endpoint: &Endpoint, path: &Path) -> Result<String, ControlError> {
    let stream = endpoint.connect()?;
    match exchange(stream, &Command::Add(path.to_path_buf()))? {
        Some(Response::Ok(url)) => Ok(url),
        Some(Response::Error(reason)) => Err(ControlError::Server(reason)),
        None => Err(ControlError::Protocol("connection closed".to_string())),
    }
}

/// Is a primary accepting connections right now?
pub fn is_running(endpoint: &Endpoint) -> bool {
    endpoint.connect().is_ok()
}

/// Ask the primary to shut down and wait (bounded) for its socket to go.
pub fn stop(endpoint: &Endpoint, wait: Duration) -> Result<(), ControlError> {
    let stream = endpoint.connect()?;
    match exchange(stream, &Command::Stop)? {
        // the connection may also just close
        Some(Response::Ok(_)) | None => {}
        Some(Response::Error(reason)) => return Err(ControlError::Server(reason)),
    }

    let deadline = Instant::now() + wait;
    while endpoint.socket_path().exists() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    Ok(())
}

/// Send one command, read one response line. `None` on a closed connection.
fn exchange(mut stream: UnixStream, command: &Command) -> Result<Option<Response>, ControlError> {
    stream.set_read_timeout(Some(RESPONSE_TIMEOUT))?;
    stream.write_all(command.to_line().as_bytes())?;

    let mut line = String::new();
    if BufReader::new(&stream).read_line(&mut line)? == 0 {
        return Ok(None);
    }

    Response::parse(&line)
        .map(Some)
        .ok_or_else(|| ControlError::Protocol(line.trim_end().to_string()))
}
