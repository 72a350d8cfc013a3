//! The primary instance: owns the control socket, the HTTP server and
//! every tracked file.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

use crate::config::LumConfig;
use crate::control::{self, ControlContext, ControlListener};
use crate::core::Shutdown;
use crate::registry::Registry;
use crate::render::MarkdownRenderer;
use crate::serve::{HttpServer, file_url, index_url};
use crate::{debug, log};

/// Worker threads for change detectors and the control server.
const RUNTIME_THREADS: usize = 2;

/// Everything acquired after the control socket is bound.
struct Started {
    http: HttpServer,
    runtime: Runtime,
    registry: Arc<Registry>,
    url: String,
}

/// Serve until Ctrl+C or `STOP`.
///
/// `listener` must already be bound; `file`, when given, is absolute and
/// tracked before the URL is printed.
pub fn run(config: &LumConfig, listener: ControlListener, file: Option<&Path>) -> Result<()> {
    let Started {
        http,
        runtime,
        registry,
        url,
    } = match start(config, file) {
        Ok(started) => started,
        Err(e) => {
            // the claim lock goes with `listener`; the socket file does not
            let _ = listener.endpoint().remove_socket();
            return Err(e);
        }
    };

    let port = http.port();
    let shutdown = Shutdown::new();
    shutdown.register_server(http.handle());
    shutdown.install_signal_handler()?;

    let ctx = Arc::new(ControlContext {
        registry: Arc::clone(&registry),
        port,
        shutdown: shutdown.clone(),
    });
    let control = runtime.spawn(control::serve(listener, ctx));

    println!("{url}");
    log!("serve"; "{}", url);

    let served = http.run(Arc::clone(&registry), shutdown.clone());
    // the request loop only ends on shutdown, unless it failed to start
    shutdown.request();

    let controlled = runtime.block_on(control);
    registry.close();
    debug!("serve"; "stopped");

    served?;
    controlled.context("control server task failed")??;
    Ok(())
}

fn start(config: &LumConfig, file: Option<&Path>) -> Result<Started> {
    let http = HttpServer::bind(config.serve.port)?;
    let port = http.port();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(RUNTIME_THREADS)
        .thread_name("lum-rt")
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let renderer = MarkdownRenderer::new(&config.render)?;
    let registry = Arc::new(Registry::new(Arc::new(renderer), runtime.handle().clone()));

    let url = match file {
        Some(path) => {
            registry.add(path)?;
            file_url(port, path)
        }
        None => index_url(port),
    };

    Ok(Started {
        http,
        runtime,
        registry,
        url,
    })
}
