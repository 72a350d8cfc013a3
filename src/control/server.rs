//! Control server: runs inside the primary instance.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

use super::endpoint::ControlListener;
use super::protocol::{Command, Response};
use super::ControlError;
use crate::core::Shutdown;
use crate::registry::Registry;
use crate::serve::file_url;
use crate::{debug, log};

/// Longest command line accepted (bytes).
const MAX_LINE: u64 = 8 * 1024;

/// What a control connection can act on.
pub struct ControlContext {
    pub registry: Arc<Registry>,
    /// HTTP port, embedded in returned URLs
    pub port: u16,
    pub shutdown: Shutdown,
}

/// Accept commands until shutdown, then remove the socket and release the claim.
pub async fn serve(bound: ControlListener, ctx: Arc<ControlContext>) -> Result<(), ControlError> {
    let ControlListener {
        listener,
        endpoint,
        lock,
    } = bound;
    let listener = UnixListener::from_std(listener)?;
    log!("control"; "listening at {}", endpoint.socket_path().display());

    loop {
        tokio::select! {
            _ = ctx.shutdown.wait() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    let ctx = Arc::clone(&ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &ctx).await {
                            log!("control"; "connection error: {}", e);
                        }
                    });
                }
                Err(e) => log!("control"; "accept failed: {}", e),
            }
        }
    }

    drop(listener);
    if let Err(e) = endpoint.remove_socket() {
        log!("control"; "failed to remove {}: {}", endpoint.socket_path().display(), e);
    }
    // releases the claim
    drop(lock);
    debug!("control"; "closed {}", endpoint.socket_path().display());
    Ok(())
}

/// Read one line, dispatch, answer one line.
async fn handle_connection(mut stream: UnixStream, ctx: &ControlContext) -> std::io::Result<()> {
    let (read, mut write) = stream.split();
    let mut reader = BufReader::new(read.take(MAX_LINE));

    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(());
    }
    debug!("control"; "received {:?}", line.trim_end());

    let (response, stop) = match Command::parse(&line) {
        Ok(Command::Stop) => (Response::Ok("stopping".to_string()), true),
        Ok(Command::Add(path)) => (add(path, ctx).await, false),
        Err(e) => (Response::Error(e.to_string()), false),
    };

    write.write_all(response.to_line().as_bytes()).await?;
    write.shutdown().await?;

    if stop {
        log!("control"; "stop requested");
        ctx.shutdown.request();
    }
    Ok(())
}

async fn add(path: PathBuf, ctx: &ControlContext) -> Response {
    if !path.is_absolute() {
        return Response::Error(format!("path must be absolute: {}", path.display()));
    }
    if !path.exists() {
        return Response::Error(format!("file does not exist: {}", path.display()));
    }

    // render + watch setup is blocking work
    let registry = Arc::clone(&ctx.registry);
    let target = path.clone();
    match tokio::task::spawn_blocking(move || registry.add(&target)).await {
        Ok(Ok(_)) => {
            log!("control"; "added {}", path.display());
            Response::Ok(file_url(ctx.port, &path))
        }
        Ok(Err(e)) => Response::Error(format!("failed to add file: {e}")),
        Err(e) => Response::Error(format!("failed to add file: {e}")),
    }
}
