//! Change Detector - one per tracked file.
//!
//! Watches the file's *parent directory* so replace-via-rename and
//! delete-recreate saves keep being observed after the inode changes.
//!
//! ```text
//! notify (dir) → filter (filename, kind) → Debouncer → render w/ retry → publish "reload"
//! ```
//!
//! The detector task ends when its watcher is dropped (the event channel
//! closes) or when its [`TrackedFile`] is gone.

mod debouncer;
mod filter;


use std::ffi::OsString;
use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::hub::RELOAD;
use crate::registry::TrackedFile;
use crate::render::{Render, RenderError};
use debouncer::Debouncer;

/// Render attempts per settled change while the file is missing.
pub const MAX_ATTEMPTS: u32 = 10;
/// Pause between attempts.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Start watching `file` and spawn its detector task on `runtime`.
///
/// The returned watcher is the file's watch handle: dropping it stops the
/// detector.
pub fn spawn(
    file: &Arc<TrackedFile>,
    renderer: Arc<dyn Render>,
    runtime: &Handle,
) -> notify::Result<RecommendedWatcher> {
    let path = file.path();
    let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
        return Err(notify::Error::generic("path has no parent directory").add_path(path.into()));
    };
    let name = name.to_os_string();

    let (tx, rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = tx.send(res);
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;

    crate::debug!("watch"; "watching {} for {}", dir.display(), name.to_string_lossy());
    runtime.spawn(run(rx, Arc::downgrade(file), name, renderer));

    Ok(watcher)
}

/// Detector event loop.
async fn run(
    mut rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    file: Weak<TrackedFile>,
    name: OsString,
    renderer: Arc<dyn Render>,
) {
    let mut debouncer = Debouncer::new();

    loop {
        tokio::select! {
            biased;
            msg = rx.recv() => match msg {
                Some(Ok(event)) => {
                    if filter::is_relevant(&event, &name) {
                        crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);
                        debouncer.record();
                    }
                }
                Some(Err(e)) => crate::log!("watch"; "notify error: {}", e),
                // watcher dropped
                None => break,
            },
            _ = tokio::time::sleep(debouncer.sleep_duration()), if debouncer.is_pending() => {
                if !debouncer.take_if_ready() {
                    continue;
                }
                let Some(file) = file.upgrade() else {
                    break;
                };
                reload(&file, &renderer).await;
                debouncer.reloaded();
            }
        }
    }

    crate::debug!("watch"; "detector for {} stopped", name.to_string_lossy());
}

/// Re-render a settled change and notify the file's subscribers.
///
/// On failure the previous content stays in place.
async fn reload(file: &TrackedFile, renderer: &Arc<dyn Render>) {
    match render_with_retry(renderer, file.path()).await {
        Ok(html) => {
            file.set_content(html);
            let delivered = file.subscribers().publish(RELOAD);
            crate::log!("watch"; "reloaded {} ({} clients)", file.path().display(), delivered);
        }
        Err(e) => {
            crate::log!("watch"; "failed to render {}: {}", file.path().display(), e);
        }
    }
}

/// Render `path`, retrying only while the file is missing.
///
/// Bounded: at most [`MAX_ATTEMPTS`] calls, [`RETRY_BACKOFF`] apart. Each
/// attempt runs on the blocking pool; the backoff stays on the runtime.
pub(crate) async fn render_with_retry(
    renderer: &Arc<dyn Render>,
    path: &Path,
) -> Result<Vec<u8>, RenderError> {
    let mut attempt = 1;
    loop {
        match render_blocking(renderer, path).await {
            Ok(html) => return Ok(html),
            Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                crate::debug!("watch"; "{} missing, retry {}/{}", path.display(), attempt, MAX_ATTEMPTS);
                attempt += 1;
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn render_blocking(
    renderer: &Arc<dyn Render>,
    path: &Path,
) -> Result<Vec<u8>, RenderError> {
    let renderer = Arc::clone(renderer);
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || renderer.render(&owned))
        .await
        .unwrap_or_else(|e| {
            crate::debug!("watch"; "render task failed: {}", e);
            Err(RenderError::Aborted(path.to_path_buf()))
        })
}
