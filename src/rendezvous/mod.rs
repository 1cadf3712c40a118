//! Rendezvous listener for the terminal helper.
//!
//! The rendezvous protocol is strictly 1:1 — one listener, one helper, one
//! connection — so the listen backlog is exactly 1. The lifecycle is:
//!
//! ```text
//! bind(path) ──► helper launched ──► accept (30 s absolute deadline,
//!                                    cancel checked at every wake-up)
//!        │                                   │
//!        └────────── close + unlink ◄────────┘  (every path, exactly once)
//! ```
//!
//! The socket is created under the most permissive file mode so a helper
//! running as the console user can connect to a daemon-owned endpoint; the
//! process umask is restored immediately after bind on every exit path.

// Rust guideline compliant 2026-02

pub mod handoff;

use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::FromRawFd;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use crate::cancel::CancelFlag;
use crate::constants::{ACCEPT_POLL_INTERVAL, MAX_SOCK_PATH};
use crate::error::{Result, SessionError};

/// Result of waiting for the helper to connect.
#[derive(Debug)]
pub enum AcceptOutcome {
    /// The helper connected; the stream is ready for the handoff.
    Accepted(UnixStream),
    /// The absolute deadline elapsed with no connection. Soft outcome.
    TimedOut,
    /// Cooperative cancellation was observed. Soft outcome.
    Cancelled,
}

/// Listening rendezvous endpoint bound to a filesystem path.
///
/// Dropping the listener closes the socket and removes the path, so every
/// exit path — accept, timeout, cancel, or error — releases the endpoint
/// exactly once.
#[derive(Debug)]
pub struct RendezvousListener {
    listener: UnixListener,
    path: PathBuf,
}

impl RendezvousListener {
    /// Bind a fresh listening endpoint at `path`.
    ///
    /// Any stale socket left at `path` by a previous session is removed
    /// first. The bind happens under `umask(0)` — restored before this
    /// function returns, success or failure — and the backlog is exactly 1.
    pub fn bind(path: &Path) -> Result<Self> {
        if path.as_os_str().as_bytes().len() >= MAX_SOCK_PATH {
            return Err(SessionError::Resource {
                message: format!("socket path too long: {}", path.display()),
                source: io::Error::from(io::ErrorKind::InvalidInput),
            });
        }

        // Remove a stale endpoint from a previous run.
        match fs::remove_file(path) {
            Ok(()) => log::debug!("[rendezvous] removed stale socket {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(SessionError::Resource {
                    message: format!("remove stale socket {}", path.display()),
                    source: e,
                })
            }
        }

        let listener = bind_backlog_one(path).map_err(|e| SessionError::Resource {
            message: format!("bind rendezvous socket {}", path.display()),
            source: e,
        })?;

        log::debug!("[rendezvous] listening on {}", path.display());
        Ok(Self { listener, path: path.to_path_buf() })
    }

    /// Path of the bound endpoint.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the helper to connect, bounded by an absolute `deadline`.
    ///
    /// The remaining interval is recomputed against `deadline` on every
    /// iteration — the deadline is never extended. The cancel flag is
    /// checked once per wake-up. An already-elapsed deadline returns
    /// [`AcceptOutcome::TimedOut`] without waiting at all.
    pub fn accept_deadline(
        &self,
        deadline: Instant,
        cancel: &CancelFlag,
    ) -> Result<AcceptOutcome> {
        self.listener
            .set_nonblocking(true)
            .map_err(SessionError::Accept)?;

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(AcceptOutcome::TimedOut);
            }
            if cancel.is_cancelled() {
                return Ok(AcceptOutcome::Cancelled);
            }

            match self.listener.accept() {
                Ok((stream, _)) => {
                    stream.set_nonblocking(false).map_err(SessionError::Accept)?;
                    log::debug!("[rendezvous] helper connected on {}", self.path.display());
                    return Ok(AcceptOutcome::Accepted(stream));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    let remaining = deadline.saturating_duration_since(now);
                    thread::sleep(remaining.min(ACCEPT_POLL_INTERVAL));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(SessionError::Accept(e)),
            }
        }
    }

    /// Release the endpoint explicitly. Equivalent to dropping.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for RendezvousListener {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("[rendezvous] unlink {} failed: {e}", self.path.display());
            }
        }
    }
}

/// Bind a Unix stream listener with a backlog of exactly 1.
///
/// `std::os::unix::net::UnixListener::bind` hardcodes a larger backlog, so
/// the socket is assembled through libc and handed to the std wrapper. The
/// process umask is zeroed around the bind and restored on every exit path.
fn bind_backlog_one(path: &Path) -> io::Result<UnixListener> {
    let bytes = path.as_os_str().as_bytes();

    // SAFETY: sockaddr_un is plain-old-data; zeroing gives a valid empty path.
    let mut addr: libc::sockaddr_un = unsafe { std::mem::zeroed() };
    if bytes.len() >= addr.sun_path.len() {
        return Err(io::Error::from(io::ErrorKind::InvalidInput));
    }
    addr.sun_family = libc::AF_UNIX as libc::sa_family_t;
    for (dst, src) in addr.sun_path.iter_mut().zip(bytes) {
        *dst = *src as libc::c_char;
    }

    // SAFETY: plain socket(2) call; the fd is checked before use.
    let fd = unsafe { libc::socket(libc::AF_UNIX, libc::SOCK_STREAM, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    // Most permissive creation mode, restored on every exit path below.
    // SAFETY: umask(2) cannot fail.
    let previous_umask = unsafe { libc::umask(0) };
    let _restore = scopeguard::guard(previous_umask, |mask| {
        // SAFETY: restoring the mask captured above.
        unsafe { libc::umask(mask) };
    });

    let len = std::mem::size_of::<libc::sockaddr_un>() as libc::socklen_t;
    // SAFETY: addr is fully initialized and outlives the call.
    let rc = unsafe { libc::bind(fd, std::ptr::addr_of!(addr).cast::<libc::sockaddr>(), len) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        // SAFETY: fd came from socket(2) above and is not yet owned.
        unsafe { libc::close(fd) };
        return Err(err);
    }

    // SAFETY: fd is a bound socket.
    let rc = unsafe { libc::listen(fd, 1) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        // SAFETY: as above.
        unsafe { libc::close(fd) };
        return Err(err);
    }

    // SAFETY: fd is a listening socket; ownership transfers to the wrapper.
    Ok(unsafe { UnixListener::from_raw_fd(fd) })
}
