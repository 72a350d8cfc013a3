//! File Registry - every Markdown file the server currently tracks.
//!
//! Constructed once per primary instance and shared (`Arc<Registry>`) with
//! the HTTP server and the control channel.
//!
//! # Adding a file
//!
//! ```text
//! write-lock: insert placeholder ─┐   (lock released)
//!                                 ├─ render ─ start detector ─ mark ready ─ publish index "reload"
//!                                 └─ any failure: write-lock: remove placeholder
//! ```
//!
//! The placeholder exists so the detector can never fire for a path the
//! registry does not know. Lookups skip entries that are not ready yet, so
//! a failed add leaves nothing observable behind. A second add of the same
//! path blocks on the placeholder until the first one settles.

mod tracked;


pub use tracked::TrackedFile;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::runtime::Handle;

use crate::hub::{RELOAD, Scope, Subscribers, Subscription};
use crate::render::{Render, RenderError};

#[derive(Debug, Error)]
pub enum AddError {
    #[error("file does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error(transparent)]
    Render(RenderError),

    #[error("failed to watch `{}`", .0.display())]
    Watch(PathBuf, #[source] notify::Error),
}

impl From<RenderError> for AddError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Missing(path) => Self::NotFound(path),
            other => Self::Render(other),
        }
    }
}

/// Concurrent path → [`TrackedFile`] map plus the index feed.
pub struct Registry {
    files: RwLock<FxHashMap<PathBuf, Arc<TrackedFile>>>,
    index: Arc<Subscribers>,
    renderer: Arc<dyn Render>,
    /// Runtime the change detectors run on
    runtime: Handle,
}

impl Registry {
    pub fn new(renderer: Arc<dyn Render>, runtime: Handle) -> Self {
        Self {
            files: RwLock::new(FxHashMap::default()),
            index: Arc::new(Subscribers::new()),
            renderer,
            runtime,
        }
    }

    /// Track `path` (absolute). Returns `Ok(false)` if it already was.
    ///
    /// All-or-nothing: on error the registry is unchanged. A concurrent add
    /// of the same path waits for the first one to finish, and takes over
    /// if that one failed.
    pub fn add(&self, path: &Path) -> Result<bool, AddError> {
        let file = loop {
            let mut files = self.files.write();
            let Some(existing) = files.get(path).cloned() else {
                let file = Arc::new(TrackedFile::new(path.to_path_buf()));
                files.insert(path.to_path_buf(), Arc::clone(&file));
                break file;
            };
            drop(files);

            if existing.wait_settled() {
                crate::debug!("serve"; "already tracking {}", path.display());
                return Ok(false);
            }
        };

        if let Err(e) = self.setup(&file) {
            self.files.write().remove(path);
            file.close();
            file.mark_failed();
            return Err(e);
        }

        file.mark_ready();
        crate::log!("serve"; "tracking {}", path.display());
        self.index.publish(RELOAD);
        Ok(true)
    }

    /// Initial render, then the change detector.
    fn setup(&self, file: &Arc<TrackedFile>) -> Result<(), AddError> {
        let html = self.renderer.render(file.path())?;
        file.set_content(html);

        let watcher = crate::watch::spawn(file, Arc::clone(&self.renderer), &self.runtime)
            .map_err(|err| AddError::Watch(file.path().to_path_buf(), err))?;
        file.attach_watch(watcher);
        Ok(())
    }

    /// Look up a fully registered file.
    pub fn get(&self, path: &Path) -> Option<Arc<TrackedFile>> {
        self.files
            .read()
            .get(path)
            .filter(|file| file.is_ready())
            .cloned()
    }

    /// Snapshot of tracked paths, sorted.
    pub fn list(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .files
            .read()
            .values()
            .filter(|file| file.is_ready())
            .map(|file| file.path().to_path_buf())
            .collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Open a sink for `scope`. `None` if the file is not tracked.
    pub fn subscribe(&self, scope: &Scope) -> Option<Subscription> {
        match scope {
            Scope::Index => Some(self.index.subscribe()),
            Scope::File(path) => self.get(path).map(|file| file.subscribe()),
        }
    }

    /// Non-blocking publish; returns how many sinks accepted `message`.
    pub fn publish(&self, scope: &Scope, message: &str) -> usize {
        match scope {
            Scope::Index => self.index.publish(message),
            Scope::File(path) => self
                .get(path)
                .map(|file| file.subscribers().publish(message))
                .unwrap_or(0),
        }
    }

    /// Release every watch handle. Entries stay readable.
    pub fn close(&self) {
        let files: Vec<_> = self.files.read().values().cloned().collect();
        let closed = files.iter().filter(|file| file.close()).count();
        crate::debug!("serve"; "released {} watches", closed);
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        for file in self.files.get_mut().values() {
            file.close();
        }
    }
}
