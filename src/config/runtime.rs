//! Per-user runtime directory.
//!
//! Holds the control socket, its claim lock and the daemon log file:
//!
//! ```text
//! $XDG_RUNTIME_DIR/lum/      (or <temp-dir>/lum-<uid>/)
//! ├── control.sock
//! ├── control.lock
//! └── lum.log
//! ```

use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::control::Endpoint;
use crate::log;

const SOCKET_FILE: &str = "control.sock";
const LOCK_FILE: &str = "control.lock";
const LOG_FILE: &str = "lum.log";

#[derive(Debug, Error)]
pub enum RuntimeDirError {
    #[error("failed to create runtime directory `{0}`")]
    Create(PathBuf, #[source] std::io::Error),
}

/// Resolved runtime directory (always exists once constructed).
#[derive(Debug, Clone)]
pub struct RuntimeDir {
    root: PathBuf,
}

impl RuntimeDir {
    /// Resolve from the environment and create the directory if needed.
    pub fn resolve() -> Result<Self, RuntimeDirError> {
        let uid = nix::unistd::getuid().as_raw();
        Self::at(Self::location(std::env::var_os("XDG_RUNTIME_DIR"), uid))
    }

    /// Use `root` as the runtime directory, creating it with mode 0700.
    pub fn at(root: PathBuf) -> Result<Self, RuntimeDirError> {
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&root)
            .map_err(|err| RuntimeDirError::Create(root.clone(), err))?;
        // `mode` only applies to newly created directories
        if let Err(err) = fs::set_permissions(&root, fs::Permissions::from_mode(0o700)) {
            log!("warning"; "failed to restrict {} to 0700: {}", root.display(), err);
        }
        Ok(Self { root })
    }

    /// Location rule: `$XDG_RUNTIME_DIR/lum` when set and non-empty,
    /// `<temp-dir>/lum-<uid>` otherwise.
    pub fn location(xdg_runtime_dir: Option<OsString>, uid: u32) -> PathBuf {
        match xdg_runtime_dir.filter(|dir| !dir.is_empty()) {
            Some(dir) => PathBuf::from(dir).join("lum"),
            None => std::env::temp_dir().join(format!("lum-{uid}")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    /// Control channel endpoint inside this directory.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.root.join(SOCKET_FILE), self.root.join(LOCK_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_location_prefers_xdg_runtime_dir() {
        let path = RuntimeDir::location(Some("/run/user/1000".into()), 1000);
        assert_eq!(path, PathBuf::from("/run/user/1000/lum"));
    }

    #[test]
    fn test_location_falls_back_to_uid() {
        let path = RuntimeDir::location(None, 4242);
        assert!(path.is_absolute());
        assert!(path.ends_with("lum-4242"));

        // empty variable behaves like unset
        let empty = RuntimeDir::location(Some(OsString::new()), 4242);
        assert_eq!(empty, path);
    }

    #[test]
    fn test_at_tightens_existing_dir() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("lum");
        fs::create_dir(&root).unwrap();
        fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();

        RuntimeDir::at(root.clone()).unwrap();
        let mode = fs::metadata(&root).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[test]
    fn test_at_creates_private_dir() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("nested").join("lum");
        let dir = RuntimeDir::at(root.clone()).unwrap();

        assert!(root.is_dir());
        let mode = fs::metadata(&root).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
        assert_eq!(dir.log_path(), root.join("lum.log"));
        assert_eq!(dir.endpoint().socket_path(), root.join("control.sock").as_path());
    }
}
