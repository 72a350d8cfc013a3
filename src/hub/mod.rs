//! Notification Hub - best-effort fan-out of reload events.
//!
//! Each scope (one tracked file, or the global index feed) owns a
//! [`Subscribers`] set. Streaming HTTP handlers hold a [`Subscription`]
//! and block on it; the change detector and the registry publish into it.
//!
//! # Delivery
//!
//! ```text
//! publish("reload") --try_send--> sink 1 (bounded, capacity 8)
//!                   --try_send--> sink 2 (full: dropped for this sink only)
//! ```
//!
//! Publishing never blocks. A reload carries no state (clients re-fetch the
//! whole page), so a message dropped for a stalled client is harmless.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// The only message the server ever publishes.
pub const RELOAD: &str = "reload";

/// Per-sink buffer size.
pub const SINK_CAPACITY: usize = 8;

/// Notification address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Global file-list feed
    Index,
    /// One tracked file (absolute path)
    File(PathBuf),
}

/// Set of open sinks for one scope.
#[derive(Default)]
pub struct Subscribers {
    sinks: RwLock<FxHashMap<u64, Sender<String>>>,
    next_id: AtomicU64,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh sink. Dropping the returned handle unsubscribes it.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = channel::bounded(SINK_CAPACITY);
        self.sinks.write().insert(id, tx);
        crate::debug!("hub"; "subscriber {} registered ({} open)", id, self.len());

        Subscription {
            id,
            rx,
            owner: Arc::clone(self),
        }
    }

    /// Remove a sink. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: u64) -> bool {
        // dropping the sender closes the sink
        self.sinks.write().remove(&id).is_some()
    }

    /// Deliver `message` to every sink without blocking.
    ///
    /// Returns the number of sinks that accepted it.
    pub fn publish(&self, message: &str) -> usize {
        let sinks = self.sinks.read();
        if sinks.is_empty() {
            return 0;
        }

        let mut delivered = 0;
        for (id, tx) in sinks.iter() {
            match tx.try_send(message.to_owned()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    crate::debug!("hub"; "subscriber {} is full, dropping {:?}", id, message);
                }
                // receiver dropped; its Subscription removes the entry on drop
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.sinks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.read().is_empty()
    }
}

/// Receive side of one registration.
pub struct Subscription {
    id: u64,
    rx: Receiver<String>,
    owner: Arc<Subscribers>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait up to `timeout` for the next message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<String, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> Result<String, TryRecvError> {
        self.rx.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.owner.unsubscribe(self.id) {
            crate::debug!("hub"; "subscriber {} closed", self.id);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
