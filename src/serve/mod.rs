//! Preview HTTP server (loopback only).
//!
//! | Route                      | Response                                   |
//! |----------------------------|--------------------------------------------|
//! | `/`                        | file list                                  |
//! | `/?file=<path>`            | rendered page, 404 if untracked            |
//! | `/events?file=<path>`      | event stream, 400 without `file`, 404 if untracked |
//! | `/events/index`            | event stream for the file list             |
//! | `/<rel>?file=<path>`       | asset next to the tracked file             |

mod asset;
mod page;
mod response;
mod route;
mod stream;

#[cfg(test)]
mod tests;

pub use route::Route;

use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tiny_http::{Request, Server};

use crate::core::Shutdown;
use crate::hub::Scope;
use crate::registry::Registry;
use crate::{debug, log};

/// Worker threads for regular (non-streaming) requests.
const POOL_THREADS: usize = 4;

/// URL of a tracked file's page. The path is embedded verbatim.
pub fn file_url(port: u16, path: &Path) -> String {
    format!("http://localhost:{port}/?file={}", path.display())
}

/// URL of the file list.
pub fn index_url(port: u16) -> String {
    format!("http://localhost:{port}/")
}

/// Bound server ready to accept requests
pub struct HttpServer {
    server: Arc<Server>,
    port: u16,
}

impl HttpServer {
    /// Bind `127.0.0.1:<port>`. Port `0` picks a free port.
    pub fn bind(port: u16) -> Result<Self> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let server = Server::http(addr).map_err(|e| anyhow!("failed to bind {addr}: {e}"))?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .unwrap_or(port);

        debug!("serve"; "bound 127.0.0.1:{}", port);
        Ok(Self {
            server: Arc::new(server),
            port,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Handle used to unblock the request loop on shutdown.
    pub fn handle(&self) -> Arc<Server> {
        Arc::clone(&self.server)
    }

    /// Run the request loop until the server is unblocked.
    ///
    /// Event streams get a dedicated thread each; everything else runs on
    /// a small pool.
    pub fn run(self, registry: Arc<Registry>, shutdown: Shutdown) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(POOL_THREADS)
            .thread_name(|i| format!("lum-http-{i}"))
            .build()
            .context("failed to create thread pool")?;

        for request in self.server.incoming_requests() {
            let registry = Arc::clone(&registry);
            let shutdown = shutdown.clone();
            let route = Route::parse(request.url());

            if route.is_stream() {
                let spawned = std::thread::Builder::new()
                    .name("lum-events".into())
                    .spawn(move || handle(request, route, &registry, &shutdown));
                if let Err(e) = spawned {
                    log!("serve"; "failed to spawn stream thread: {}", e);
                }
                continue;
            }

            pool.spawn(move || handle(request, route, &registry, &shutdown));
        }

        debug!("serve"; "request loop stopped");
        Ok(())
    }
}

fn handle(request: Request, route: Route, registry: &Registry, shutdown: &Shutdown) {
    let method = request.method().clone();
    let url = request.url().to_string();
    if let Err(e) = handle_request(request, route, registry, shutdown) {
        log!("serve"; "{} {}: {:#}", method, url, e);
    }
}

/// Handle a single HTTP request
fn handle_request(
    request: Request,
    route: Route,
    registry: &Registry,
    shutdown: &Shutdown,
) -> Result<()> {
    if shutdown.is_requested() {
        return response::respond_unavailable(request);
    }

    debug!("serve"; "{} {}", request.method(), request.url());

    match route {
        Route::FileEvents(None) => response::respond_bad_request(request, "missing file parameter"),
        Route::FileEvents(Some(path)) => {
            stream_scope(request, registry, Scope::File(path))
        }
        Route::IndexEvents => stream_scope(request, registry, Scope::Index),

        _ if !response::is_read_request(&request) => {
            response::respond_method_not_allowed(request, "GET, HEAD")
        }

        Route::Index => response::send_html(request, page::index_page(&registry.list())),
        Route::Page(path) => match registry.get(&path) {
            Some(file) => response::send_html(request, page::file_page(&file)),
            None => response::respond_not_found(request),
        },
        Route::Asset { rel, file } => {
            let resolved = registry
                .get(&file)
                .and_then(|_| asset::resolve_asset(&rel, &file));
            match resolved {
                Some(path) => respond_file(request, &path),
                None => response::respond_not_found(request),
            }
        }
        Route::NotFound => response::respond_not_found(request),
    }
}

fn stream_scope(request: Request, registry: &Registry, scope: Scope) -> Result<()> {
    if request.method() != &tiny_http::Method::Get {
        return response::respond_method_not_allowed(request, "GET");
    }
    let Some(subscription) = registry.subscribe(&scope) else {
        return response::respond_not_found(request);
    };

    debug!("serve"; "stream opened for {:?}", scope);
    // a write failure just means the client left
    if let Err(e) = stream::respond_stream(request, subscription) {
        debug!("serve"; "stream closed for {:?}: {}", scope, e);
    }
    Ok(())
}

fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = crate::utils::mime::from_path(path);
    match fs::read(path) {
        Ok(body) => response::send_body(request, 200, content_type, body),
        Err(e) => {
            log!("serve"; "failed to read {}: {}", path.display(), e);
            response::respond_internal_error(request)
        }
    }
}
