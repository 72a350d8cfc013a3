//! Process lifecycle: shutdown coordination for serve mode.
//!
//! A [`Shutdown`] is created once per primary instance and cloned into
//! everything that must stop with it:
//! - the Ctrl+C handler and the control server's `STOP` command request it
//! - the HTTP accept loop is unblocked when it fires
//! - async tasks (control server) await it

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tiny_http::Server;
use tokio::sync::watch;

/// Cloneable shutdown handle.
#[derive(Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

struct Inner {
    /// Set once; never cleared
    requested: AtomicBool,
    /// Wakes async waiters
    signal: watch::Sender<bool>,
    /// HTTP server reference for unblocking `incoming_requests()`
    server: OnceLock<Arc<Server>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                requested: AtomicBool::new(false),
                signal,
                server: OnceLock::new(),
            }),
        }
    }

    /// Request shutdown. Idempotent.
    pub fn request(&self) {
        if self.inner.requested.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.signal.send_replace(true);
        if let Some(server) = self.inner.server.get() {
            server.unblock();
        }
    }

    /// Check if shutdown has been requested
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Wait until shutdown is requested.
    pub async fn wait(&self) {
        let mut rx = self.inner.signal.subscribe();
        let _ = rx.wait_for(|requested| *requested).await;
    }

    /// Register the HTTP server so a shutdown request unblocks its accept loop.
    ///
    /// Call this after binding the server, before entering the request loop.
    pub fn register_server(&self, server: Arc<Server>) {
        let server = self.inner.server.get_or_init(|| server);
        // requested before registration: unblock right away
        if self.is_requested() {
            server.unblock();
        }
    }

    /// Route Ctrl+C into this handle. Call once per process.
    ///
    /// Before a server is registered there is nothing to drain, so the
    /// process exits immediately.
    pub fn install_signal_handler(&self) -> anyhow::Result<()> {
        let shutdown = self.clone();
        ctrlc::set_handler(move || {
            if shutdown.inner.server.get().is_none() {
                std::process::exit(0);
            }
            crate::log!("serve"; "shutting down...");
            shutdown.request();
        })
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_request_is_idempotent() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_requested());

        shutdown.request();
        shutdown.request();
        assert!(shutdown.is_requested());
    }

    #[test]
    fn test_clones_share_state() {
        let shutdown = Shutdown::new();
        let other = shutdown.clone();
        other.request();
        assert!(shutdown.is_requested());
    }

    #[tokio::test]
    async fn test_wait_wakes_on_request() {
        let shutdown = Shutdown::new();
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.request();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_after_request_returns_immediately() {
        let shutdown = Shutdown::new();
        shutdown.request();
        tokio::time::timeout(Duration::from_millis(100), shutdown.wait())
            .await
            .expect("already requested");
    }

    #[test]
    fn test_register_server_after_request_unblocks() {
        let shutdown = Shutdown::new();
        shutdown.request();

        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        shutdown.register_server(Arc::clone(&server));

        // accept loop must end instead of blocking forever
        assert!(server.incoming_requests().next().is_none());
    }
}
