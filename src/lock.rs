//! Single-instance lock file.
//!
//! The lock file holds the owner's pid as decimal text. A lock whose owner
//! is no longer running is considered stale and is cleared once.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Sequence for temporary pid files, unique within this process.
static NEXT_TMP: AtomicU64 = AtomicU64::new(0);

/// Errors that can occur while acquiring the instance lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("Failed to create lock file {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to clear stale lock file {path}: {source}")]
    ClearStale {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Lock file {0} still present after clearing a stale lock")]
    Contended(PathBuf),
}

/// Outcome of reading an existing lock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Alive(u32),
    Stale,
}

/// Held single-instance lock. The lock file is removed on drop.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Try to become the only running watcher for `path`.
    ///
    /// Returns `Ok(None)` if another live process already holds the lock.
    /// A stale lock is removed and acquisition retried once.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created, a stale lock
    /// cannot be removed, or the lock reappears after being cleared.
    pub fn acquire(path: &Path) -> Result<Option<Self>, LockError> {
        Self::acquire_with(path, publish_pid)
    }

    fn acquire_with<C>(path: &Path, mut create: C) -> Result<Option<Self>, LockError>
    where
        C: FnMut(&Path) -> std::io::Result<()>,
    {
        for attempt in 0..2 {
            match create(path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), pid = std::process::id(), "Lock acquired");
                    return Ok(Some(Self {
                        path: path.to_path_buf(),
                    }));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(source) => {
                    return Err(LockError::Create {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            }

            if attempt > 0 {
                break;
            }

            match read_owner(path) {
                Owner::Alive(pid) => {
                    tracing::info!(pid, path = %path.display(), "Another watcher is already running");
                    return Ok(None);
                }
                Owner::Stale => {
                    tracing::info!(path = %path.display(), "Clearing stale lock");
                    match std::fs::remove_file(path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(source) => {
                            return Err(LockError::ClearStale {
                                path: path.to_path_buf(),
                                source,
                            })
                        }
                    }
                }
            }
        }

        Err(LockError::Contended(path.to_path_buf()))
    }

    /// Path of the held lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove lock file"
                );
            }
        }
    }
}

/// Atomically publish a lock file containing our pid.
///
/// The pid is written to a private temporary file which is then hard-linked
/// into place, so the lock is never visible without its pid. Fails with
/// `AlreadyExists` if the lock is held.
fn publish_pid(path: &Path) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        NEXT_TMP.fetch_add(1, Ordering::Relaxed)
    ));
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, std::process::id().to_string())?;
    let linked = std::fs::hard_link(&tmp, path);
    if let Err(e) = std::fs::remove_file(&tmp) {
        tracing::debug!(path = %tmp.display(), error = %e, "Failed to remove temporary lock file");
    }

    match linked {
        Err(e) if e.kind() == ErrorKind::Unsupported => create_in_place(path),
        other => other,
    }
}

/// Exclusively create the lock file and write our pid into it.
fn create_in_place(path: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(std::process::id().to_string().as_bytes())
}

fn read_owner(path: &Path) -> Owner {
    let pid = std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| raw.trim().parse::<u32>().ok());

    match pid {
        Some(pid) if process_alive(pid) => Owner::Alive(pid),
        _ => Owner::Stale,
    }
}

/// Probe whether a process with `pid` exists.
#[cfg(unix)]
#[must_use]
pub fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }

    // Signal 0 performs the permission and existence checks only. EPERM
    // means the process exists under another user.
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Probe whether a process with `pid` exists.
#[cfg(not(unix))]
#[must_use]
pub fn process_alive(pid: u32) -> bool {
    pid == std::process::id()
}
