//! HALT lock on a LiteFS database lock file
//!
//! Holding the HALT byte of `<database>-lock` pauses writes on the primary so
//! a replica can write through to it. The lock is an open file description
//! lock: it belongs to the open file, not the process, and is released when
//! the descriptor is closed.
//!
//! Linux only; other platforms get `ErrorKind::Unsupported`.

use std::fs::{File, OpenOptions};
use std::io::Result as IoResult;
use std::path::{Path, PathBuf};

/// Byte offset of the HALT lock within the lock file
pub const HALT_BYTE: i64 = 72;

/// Path of the lock file belonging to `database_path`
pub fn lock_path(database_path: &Path) -> PathBuf {
    let mut path = database_path.as_os_str().to_owned();
    path.push("-lock");
    PathBuf::from(path)
}

/// Acquire the HALT lock, blocking until it is granted
///
/// No-op on the primary node.
pub fn halt(file: &File) -> IoResult<()> {
    sys::set_lock(file, sys::LockKind::Write, true).map(|_| ())
}

/// Try to acquire the HALT lock without blocking
///
/// Returns `false` if another open file description holds it.
pub fn try_halt(file: &File) -> IoResult<bool> {
    sys::set_lock(file, sys::LockKind::Write, false)
}

/// Release the HALT lock so writes resume on the primary
pub fn unhalt(file: &File) -> IoResult<()> {
    sys::set_lock(file, sys::LockKind::Unlock, true).map(|_| ())
}

/// Run `f` while holding the HALT lock
///
/// This stops all writes on the primary for the duration of `f`, so it is
/// meant for migrations and other occasional writes from a replica. If `f`
/// fails, its error is returned and the lock is released by closing the file.
pub fn with_halt<T, E, F>(database_path: impl AsRef<Path>, f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<std::io::Error>,
{
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(lock_path(database_path.as_ref()))?;

    halt(&file)?;
    tracing::debug!("HALT lock acquired");

    let value = f()?;

    unhalt(&file)?;
    tracing::debug!("HALT lock released");
    Ok(value)
}

#[cfg(target_os = "linux")]
mod sys {
    use std::fs::File;
    use std::io::{Error as IoError, Result as IoResult};
    use std::os::unix::io::AsRawFd;

    use super::HALT_BYTE;

    pub(super) enum LockKind {
        Write,
        Unlock,
    }

    /// `fcntl(F_OFD_SETLK[W])` on the HALT byte, retried on `EINTR`
    ///
    /// Returns `false` only for a non-blocking request that conflicts with
    /// another lock.
    pub(super) fn set_lock(file: &File, kind: LockKind, wait: bool) -> IoResult<bool> {
        let fd = file.as_raw_fd();
        let cmd = if wait {
            libc::F_OFD_SETLKW
        } else {
            libc::F_OFD_SETLK
        };

        // SAFETY: flock is plain data; OFD locks require l_pid == 0.
        let mut lock: libc::flock = unsafe { std::mem::zeroed() };
        lock.l_type = match kind {
            LockKind::Write => libc::F_WRLCK as libc::c_short,
            LockKind::Unlock => libc::F_UNLCK as libc::c_short,
        };
        lock.l_whence = libc::SEEK_SET as libc::c_short;
        lock.l_start = HALT_BYTE as libc::off_t;
        lock.l_len = 1;

        loop {
            // SAFETY: fd is a valid open descriptor borrowed from `file`.
            let result = unsafe { libc::fcntl(fd, cmd, &mut lock as *mut libc::flock) };
            if result == 0 {
                return Ok(true);
            }

            let err = IoError::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::EAGAIN) | Some(libc::EACCES) if !wait => return Ok(false),
                _ => return Err(err),
            }
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod sys {
    use std::fs::File;
    use std::io::{Error as IoError, ErrorKind, Result as IoResult};

    pub(super) enum LockKind {
        Write,
        Unlock,
    }

    pub(super) fn set_lock(_file: &File, _kind: LockKind, _wait: bool) -> IoResult<bool> {
        Err(IoError::new(
            ErrorKind::Unsupported,
            "open file description locks are only supported on Linux",
        ))
    }
}
