//! Descriptor handoff wire protocol.
//!
//! One message travels daemon → helper over the accepted rendezvous
//! connection, followed by one status byte helper → daemon:
//!
//! ```text
//! byte 0: 0            (reserved flag byte)
//! byte 1: 0            success — exactly one descriptor in SCM_RIGHTS
//!         1..=255      failure code — no ancillary data
//! ```
//!
//! The invariant is `ancillary descriptor present ⇔ byte 1 == 0`. Because 0
//! is reserved for success, a failure code whose low byte is zero is
//! promoted to 1 on the wire; peers depend on this and it must never be
//! "corrected".
//!
//! The kernel duplicates a passed descriptor into the receiving process —
//! both sides hold independent descriptors for the same open file
//! description afterwards.

use std::io::{self, Read};
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;

use crate::cancel::CancelFlag;
use crate::constants::STATUS_POLL_INTERVAL;
use crate::error::{Result, SessionError};

/// Result of the blocking status-byte read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRead {
    /// The helper's completion status.
    Byte(u8),
    /// Cancellation was observed before a byte arrived. Soft outcome, not
    /// an error.
    NoStatus,
}

/// What the helper side receives from the handoff message.
#[derive(Debug)]
pub enum Handoff {
    /// Success: the transferred data-stream descriptor.
    Stream(OwnedFd),
    /// The daemon reported a failure code instead of a descriptor.
    Failure(u8),
}

/// Send the handoff message for `fd_or_code`.
///
/// A non-negative value is a descriptor: the envelope is `{0, 0}` with the
/// descriptor attached as SCM_RIGHTS ancillary data. A negative value is a
/// failure report: see [`send_failure`].
pub fn send_descriptor(stream: &UnixStream, fd_or_code: RawFd) -> Result<()> {
    if fd_or_code < 0 {
        return send_failure(stream, fd_or_code);
    }
    sendmsg_envelope(stream, 0, Some(fd_or_code))
}

/// Send a failure report: envelope `{0, code}` with no ancillary data.
///
/// Only the low byte of the magnitude fits the wire; a zero low byte is
/// promoted to 1 because 0 is reserved for success.
pub fn send_failure(stream: &UnixStream, code: i32) -> Result<()> {
    let mut wire = (code.unsigned_abs() & 0xff) as u8;
    if wire == 0 {
        wire = 1;
    }
    sendmsg_envelope(stream, wire, None)
}

/// Read the helper's single status byte.
///
/// Blocks without an overall deadline, but wakes every
/// [`STATUS_POLL_INTERVAL`] to observe the cancel flag, returning
/// [`StatusRead::NoStatus`] once it is set. Interrupted reads are retried.
/// The peer closing before one byte arrives is a protocol error — unless
/// cancellation already raced it, in which case the soft outcome wins.
pub fn read_status_byte(stream: &UnixStream, cancel: &CancelFlag) -> Result<StatusRead> {
    stream
        .set_read_timeout(Some(STATUS_POLL_INTERVAL))
        .map_err(|e| SessionError::Protocol(format!("set status read timeout: {e}")))?;

    let mut byte = [0u8; 1];
    loop {
        if cancel.is_cancelled() {
            return Ok(StatusRead::NoStatus);
        }
        match (&*stream).read(&mut byte) {
            Ok(0) => {
                if cancel.is_cancelled() {
                    return Ok(StatusRead::NoStatus);
                }
                return Err(SessionError::Protocol(
                    "peer closed before status byte".into(),
                ));
            }
            Ok(_) => return Ok(StatusRead::Byte(byte[0])),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => return Err(SessionError::Protocol(format!("status read failed: {e}"))),
        }
    }
}

/// Helper-side receive: one envelope, with descriptor extraction.
///
/// Validates the wire invariant — a descriptor is present exactly when the
/// status byte is 0 — and fails with a protocol error on any violation.
pub fn recv_descriptor(stream: &UnixStream) -> Result<Handoff> {
    let (envelope, mut fds) = recvmsg_envelope(stream)
        .map_err(|e| SessionError::Protocol(format!("handoff receive failed: {e}")))?;

    if envelope.len() != 2 {
        return Err(SessionError::Protocol(format!(
            "short handoff message: {} byte(s)",
            envelope.len()
        )));
    }
    if envelope[0] != 0 {
        return Err(SessionError::Protocol(format!(
            "bad handoff flag byte: {:#04x}",
            envelope[0]
        )));
    }

    match (envelope[1], fds.len()) {
        (0, 1) => Ok(Handoff::Stream(fds.remove(0))),
        (0, n) => Err(SessionError::Protocol(format!(
            "success envelope carried {n} descriptors, expected 1"
        ))),
        (code, 0) => Ok(Handoff::Failure(code)),
        (code, n) => Err(SessionError::Protocol(format!(
            "failure envelope (code {code}) carried {n} descriptor(s)"
        ))),
    }
}

// ── SCM_RIGHTS plumbing ──────────────────────────────────────────────────────

/// Send the 2-byte envelope `{0, status}` with an optional SCM_RIGHTS
/// descriptor, in a single `sendmsg` call.
///
/// Anything other than both bytes being accepted is a protocol error.
fn sendmsg_envelope(stream: &UnixStream, status: u8, fd: Option<RawFd>) -> Result<()> {
    let sock_fd = stream.as_raw_fd();
    let envelope: [u8; 2] = [0, status];

    let mut iov = libc::iovec {
        iov_base: envelope.as_ptr() as *mut libc::c_void,
        iov_len: envelope.len(),
    };

    let fd_size = std::mem::size_of::<libc::c_int>();
    // SAFETY: CMSG_SPACE is a pure size computation.
    let cmsg_space = unsafe { libc::CMSG_SPACE(fd_size as u32) } as usize;
    let mut cmsg_buf = vec![0u8; cmsg_space];

    // SAFETY: msghdr is plain-old-data.
    let mut msg: libc::msghdr = unsafe { std::mem::zeroed() };
    msg.msg_iov = &mut iov;
    msg.msg_iovlen = 1;

    if let Some(fd) = fd {
        msg.msg_control = cmsg_buf.as_mut_ptr().cast::<libc::c_void>();
        msg.msg_controllen = cmsg_space as _;

        // SAFETY: msg_control points at a buffer of CMSG_SPACE bytes, so the
        // first header and its data region are in bounds.
        unsafe {
            let cmsg = libc::CMSG_FIRSTHDR(&msg);
            (*cmsg).cmsg_level = libc::SOL_SOCKET;
            (*cmsg).cmsg_type = libc::SCM_RIGHTS;
            (*cmsg).cmsg_len = libc::CMSG_LEN(fd_size as u32) as _;
            std::ptr::write_unaligned(libc::CMSG_DATA(cmsg).cast::<libc::c_int>(), fd);
        }
    }

    // SAFETY: msg and everything it points at are live for the call.
    let n = unsafe { libc::sendmsg(sock_fd, &msg, 0) };
    if n < 0 {
        return Err(SessionError::Protocol(format!(
            "handoff sendmsg failed: {}",
            io::Error::last_os_error()
        )));
    }
    if n as usize != envelope.len() {
        return Err(SessionError::Protocol(format!(
            "short handoff write: {n} of {} bytes",
            envelope.len()
        )));
    }
    Ok(())
}

/// Receive one envelope and any SCM_RIGHTS descriptors attached to it.
fn recvmsg_envelope(stream: &UnixStream) -> io::Result<(Vec<u8>, Vec<OwnedFd>)> {
    let sock_fd = stream.as_raw_fd();
    let mut data_buf = vec![0u8; 2];

    let fd_size = std::mem::size_of::<libc::c_int>();
    // SAFETY: CMSG_SPACE is a pure size computation.
    let cmsg_space = unsafe { libc::CMSG_SPACE(fd_size as u32) } as usize;
    let mut cmsg_buf = vec![0u8; cmsg_space * 4]; // room for a few descriptors

    let mut iov = libc::iovec {
        iov_base: data_buf.as_mut_ptr().cast::<libc::c_void>(),
        iov_len: data_buf.len(),
    };
    // SAFETY: msghdr is plain-old-data.
    let mut msg: libc::msghdr = unsafe { std::mem::zeroed() };
    msg.msg_iov = &mut iov;
    msg.msg_iovlen = 1;
    msg.msg_control = cmsg_buf.as_mut_ptr().cast::<libc::c_void>();
    msg.msg_controllen = cmsg_buf.len() as _;

    let n = loop {
        // SAFETY: msg and its buffers are live for the call.
        let n = unsafe { libc::recvmsg(sock_fd, &mut msg, 0) };
        if n >= 0 {
            break n;
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    };
    data_buf.truncate(n as usize);

    let mut fds = Vec::new();
    // SAFETY: recvmsg initialized the control region; CMSG iteration stays
    // within msg_controllen.
    unsafe {
        let mut cmsg = libc::CMSG_FIRSTHDR(&msg);
        while !cmsg.is_null() {
            if (*cmsg).cmsg_level == libc::SOL_SOCKET && (*cmsg).cmsg_type == libc::SCM_RIGHTS {
                let data = libc::CMSG_DATA(cmsg);
                let count =
                    ((*cmsg).cmsg_len as usize - libc::CMSG_LEN(0) as usize) / fd_size;
                for i in 0..count {
                    let fd: libc::c_int =
                        std::ptr::read_unaligned(data.add(i * fd_size).cast::<libc::c_int>());
                    fds.push(OwnedFd::from_raw_fd(fd));
                }
            }
            cmsg = libc::CMSG_NXTHDR(&msg, cmsg);
        }
    }

    Ok((data_buf, fds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    /// Anonymous pipe for verifying that a passed descriptor references the
    /// same underlying resource.
    fn pipe() -> (OwnedFd, OwnedFd) {
        let mut fds: [libc::c_int; 2] = [0; 2];
        // SAFETY: pipe(2) with a valid out-array.
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(rc, 0, "pipe: {}", io::Error::last_os_error());
        // SAFETY: both fds are fresh and owned by us.
        unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) }
    }

    fn read_fd(fd: &OwnedFd, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        // SAFETY: read(2) into a buffer of matching length.
        let n = unsafe {
            libc::read(fd.as_raw_fd(), buf.as_mut_ptr().cast::<libc::c_void>(), buf.len())
        };
        assert!(n >= 0, "read: {}", io::Error::last_os_error());
        buf.truncate(n as usize);
        buf
    }

    #[test]
    fn passed_descriptor_references_the_same_resource() {
        let (daemon, helper) = UnixStream::pair().expect("socketpair");
        let (pipe_read, pipe_write) = pipe();

        send_descriptor(&daemon, pipe_read.as_raw_fd()).expect("send");

        let received = match recv_descriptor(&helper).expect("recv") {
            Handoff::Stream(fd) => fd,
            Handoff::Failure(code) => panic!("unexpected failure code {code}"),
        };

        // Sender closes its copy; the kernel-duplicated descriptor survives.
        drop(pipe_read);
        let mut writer = std::fs::File::from(pipe_write);
        writer.write_all(b"through the handoff").expect("pipe write");
        drop(writer);

        assert_eq!(read_fd(&received, 64), b"through the handoff");
    }

    #[test]
    fn negative_code_becomes_failure_envelope() {
        let (daemon, helper) = UnixStream::pair().expect("socketpair");
        send_descriptor(&daemon, -123).expect("send");
        match recv_descriptor(&helper).expect("recv") {
            Handoff::Failure(code) => assert_eq!(code, 123),
            Handoff::Stream(_) => panic!("failure envelope must not carry a descriptor"),
        }
    }

    #[test]
    fn failure_envelope_bytes_on_the_wire() {
        let (daemon, helper) = UnixStream::pair().expect("socketpair");
        send_failure(&daemon, 123).expect("send");

        let mut raw = [0u8; 2];
        (&helper).read_exact(&mut raw).expect("raw read");
        assert_eq!(raw, [0, 123]);
    }

    #[test]
    fn zero_magnitude_code_is_promoted_to_one() {
        let (daemon, helper) = UnixStream::pair().expect("socketpair");
        send_failure(&daemon, 0).expect("send");
        match recv_descriptor(&helper).expect("recv") {
            Handoff::Failure(code) => assert_eq!(code, 1, "0 is reserved for success"),
            Handoff::Stream(_) => panic!("unexpected descriptor"),
        }

        // -256 truncates to a zero low byte and must also promote to 1.
        let (daemon, helper) = UnixStream::pair().expect("socketpair");
        send_descriptor(&daemon, -256).expect("send");
        match recv_descriptor(&helper).expect("recv") {
            Handoff::Failure(code) => assert_eq!(code, 1),
            Handoff::Stream(_) => panic!("unexpected descriptor"),
        }
    }

    #[test]
    fn status_byte_round_trip() {
        let (daemon, mut helper) = UnixStream::pair().expect("socketpair");
        helper.write_all(&[0x2a]).expect("write status");
        let got = read_status_byte(&daemon, &CancelFlag::new()).expect("read");
        assert_eq!(got, StatusRead::Byte(0x2a));
    }

    #[test]
    fn peer_close_without_status_is_a_protocol_error() {
        let (daemon, helper) = UnixStream::pair().expect("socketpair");
        drop(helper);
        let err = read_status_byte(&daemon, &CancelFlag::new()).expect_err("must fail");
        assert!(matches!(err, SessionError::Protocol(_)));
    }

    #[test]
    fn cancellation_during_status_wait_is_soft() {
        let (daemon, _helper) = UnixStream::pair().expect("socketpair");
        let cancel = CancelFlag::new();

        let canceller = cancel.clone();
        let setter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });

        let got = read_status_byte(&daemon, &cancel).expect("read");
        assert_eq!(got, StatusRead::NoStatus);
        setter.join().expect("setter thread");
    }
}
