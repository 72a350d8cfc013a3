use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::ControlError;

/// Where the primary instance listens, plus the lock guarding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    socket: PathBuf,
    lock: PathBuf,
}

/// Bound control socket; holds the claim lock until dropped.
#[derive(Debug)]
pub struct ControlListener {
    pub(super) listener: UnixListener,
    pub(super) endpoint: Endpoint,
    pub(super) lock: File,
}

impl Endpoint {
    pub fn new(socket: PathBuf, lock: PathBuf) -> Self {
        Self { socket, lock }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock
    }

    /// Connect to a live primary.
    ///
    /// A missing socket file and a socket nobody accepts on (left behind
    /// by a crash) both mean [`ControlError::NoInstance`].
    pub fn connect(&self) -> Result<UnixStream, ControlError> {
        if !self.socket.exists() {
            return Err(ControlError::NoInstance);
        }
        UnixStream::connect(&self.socket).map_err(|e| {
            crate::debug!("control"; "stale endpoint {}: {}", self.socket.display(), e);
            ControlError::NoInstance
        })
    }

    /// Become the primary: claim the lock, clear a stale socket, bind.
    ///
    /// The exclusive `flock` makes claim-and-bind atomic across processes;
    /// the kernel drops it if the holder dies.
    pub fn bind(&self) -> Result<ControlListener, ControlError> {
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.lock)?;

        if let Err(e) = lock.try_lock_exclusive() {
            return Err(if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                ControlError::AlreadyRunning(self.socket.clone())
            } else {
                ControlError::Io(e)
            });
        }

        if self.socket.exists() {
            // a live peer that does not use the lock still wins
            if UnixStream::connect(&self.socket).is_ok() {
                return Err(ControlError::AlreadyRunning(self.socket.clone()));
            }
            crate::debug!("control"; "removing stale socket {}", self.socket.display());
            self.remove_socket()?;
        }

        let listener = UnixListener::bind(&self.socket)?;
        listener.set_nonblocking(true)?;

        Ok(ControlListener {
            listener,
            endpoint: self.clone(),
            lock,
        })
    }

    /// Remove the socket file. Missing is fine.
    pub fn remove_socket(&self) -> io::Result<()> {
        match fs::remove_file(&self.socket) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl ControlListener {
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}
