use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::RecommendedWatcher;
use parking_lot::{Condvar, Mutex, RwLock};

use crate::hub::{Subscribers, Subscription};

/// Progress of the `add` that created an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Setup {
    Pending,
    Ready,
    Failed,
}

/// One Markdown file being served and watched.
///
/// Content, subscribers and the watch handle sit behind independent locks:
/// a reload never waits on a client subscribing, and vice versa.
pub struct TrackedFile {
    path: PathBuf,
    content: RwLock<Vec<u8>>,
    subscribers: Arc<Subscribers>,
    watch: Mutex<Option<RecommendedWatcher>>,
    /// `Ready` once the initial render and the watch both succeeded
    setup: Mutex<Setup>,
    settled: Condvar,
}

impl TrackedFile {
    pub(super) fn new(path: PathBuf) -> Self {
        Self {
            path,
            content: RwLock::new(Vec::new()),
            subscribers: Arc::new(Subscribers::new()),
            watch: Mutex::new(None),
            setup: Mutex::new(Setup::Pending),
            settled: Condvar::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the latest rendered HTML.
    pub fn content(&self) -> Vec<u8> {
        self.content.read().clone()
    }

    pub(crate) fn set_content(&self, html: Vec<u8>) {
        *self.content.write() = html;
    }

    pub fn subscribers(&self) -> &Arc<Subscribers> {
        &self.subscribers
    }

    pub fn subscribe(&self) -> Subscription {
        self.subscribers.subscribe()
    }

    pub fn is_watching(&self) -> bool {
        self.watch.lock().is_some()
    }

    pub(super) fn attach_watch(&self, watcher: RecommendedWatcher) {
        *self.watch.lock() = Some(watcher);
    }

    /// Release the watch handle, which also ends the change detector.
    pub(super) fn close(&self) -> bool {
        self.watch.lock().take().is_some()
    }

    pub(super) fn is_ready(&self) -> bool {
        *self.setup.lock() == Setup::Ready
    }

    pub(super) fn mark_ready(&self) {
        self.settle(Setup::Ready);
    }

    pub(super) fn mark_failed(&self) {
        self.settle(Setup::Failed);
    }

    /// Block until the creating `add` finishes. `true` if it succeeded.
    pub(super) fn wait_settled(&self) -> bool {
        let mut setup = self.setup.lock();
        while *setup == Setup::Pending {
            self.settled.wait(&mut setup);
        }
        *setup == Setup::Ready
    }

    fn settle(&self, outcome: Setup) {
        *self.setup.lock() = outcome;
        self.settled.notify_all();
    }
}

impl std::fmt::Debug for TrackedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedFile")
            .field("path", &self.path)
            .field("ready", &self.is_ready())
            .field("watching", &self.is_watching())
            .finish()
    }
}
