//! Terminal-session orchestration.
//!
//! Composes the rendezvous listener, the helper launcher, and the descriptor
//! handoff into one synchronous session:
//!
//! ```text
//! Idle ──bind──► Listening ──launch ok──► Launched ──accept──► Connected
//!                    │                        │                    │
//!                    │ launch fails           │ timeout/cancel     │ handoff +
//!                    ▼                        ▼                    ▼ status byte
//!                  Failed                 Cancelled            Completed
//! ```
//!
//! Failure exits lead to `Failed` from every state. Timeout and cancellation
//! are soft outcomes — the surrounding connection attempt may already be
//! tearing down — and never surface as errors. The listener is bound before
//! the helper is launched (the helper connects immediately on start) and is
//! released exactly once on every path, RAII-backed.

use std::ffi::OsString;
use std::os::unix::io::RawFd;
use std::path::Path;
use std::time::Instant;

use crate::constants::CONTACT_TIMEOUT;
use crate::context::SessionContext;
use crate::error::{Result, SessionError};
use crate::launch::HelperLauncher;
use crate::rendezvous::handoff::{read_status_byte, send_descriptor, StatusRead};
use crate::rendezvous::{AcceptOutcome, RendezvousListener};

/// Orchestration states of one terminal session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not started.
    Idle,
    /// Rendezvous endpoint bound, helper not yet launched.
    Listening,
    /// Helper launched, waiting for it to connect.
    Launched,
    /// Helper connected, handoff in progress.
    Connected,
    /// Status byte received; the session produced a result.
    Completed,
    /// Soft exit: timeout or cooperative cancellation.
    Cancelled,
    /// Hard failure; see the returned [`SessionError`].
    Failed,
}

/// Result of a terminal session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalOutcome {
    /// The helper reported this completion status (0 = success).
    Completed(u8),
    /// No helper connected within the contact window.
    TimedOut,
    /// Cancellation was observed while waiting for the helper.
    Cancelled,
    /// Cancellation raced the final status read.
    NoStatus,
}

impl TerminalOutcome {
    /// Effective completion code of the interactive terminal step.
    ///
    /// Soft outcomes report 0: a session torn down by the surrounding
    /// connection attempt is not a failure of the terminal step.
    pub fn effective_code(self) -> u8 {
        match self {
            Self::Completed(code) => code,
            Self::TimedOut | Self::Cancelled | Self::NoStatus => 0,
        }
    }
}

/// One terminal-helper rendezvous session.
///
/// Created per terminal request; `run` drives the whole session
/// synchronously and consumes at most one helper connection.
pub struct TerminalSession<'a> {
    cx: &'a SessionContext,
    launcher: &'a dyn HelperLauncher,
    state: SessionState,
}

impl std::fmt::Debug for TerminalSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSession")
            .field("service_id", &self.cx.service_id)
            .field("state", &self.state)
            .finish()
    }
}

impl<'a> TerminalSession<'a> {
    /// Create an idle session for this connection attempt.
    pub fn new(cx: &'a SessionContext, launcher: &'a dyn HelperLauncher) -> Self {
        Self { cx, launcher, state: SessionState::Idle }
    }

    /// Current orchestration state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        log::debug!(
            "[terminal-session] {} {:?} -> {next:?}",
            self.cx.service_id,
            self.state
        );
        self.state = next;
    }

    /// Run the session: bind, launch `helper`, accept, hand off `link_fd`,
    /// read back the status byte.
    ///
    /// The contact deadline is fixed here — session start + 30 s — and never
    /// extended. Hard failures release the listener before returning.
    pub fn run(&mut self, helper: &Path, link_fd: RawFd) -> Result<TerminalOutcome> {
        let deadline = Instant::now() + CONTACT_TIMEOUT;

        let listener = match RendezvousListener::bind(&self.cx.rendezvous_path) {
            Ok(listener) => listener,
            Err(e) => {
                self.transition(SessionState::Failed);
                return Err(e);
            }
        };
        self.transition(SessionState::Listening);

        // The helper connects immediately on start, so the listener above
        // must already be bound. Launch failure releases it via drop.
        let args = vec![OsString::from(listener.path().as_os_str())];
        if let Err(e) = self.launcher.launch_async(helper, &args) {
            self.transition(SessionState::Failed);
            drop(listener);
            return Err(SessionError::Launch {
                message: format!("start {}", helper.display()),
                source: e,
            });
        }
        self.transition(SessionState::Launched);

        let stream = match listener.accept_deadline(deadline, &self.cx.cancel) {
            Ok(AcceptOutcome::Accepted(stream)) => stream,
            Ok(AcceptOutcome::TimedOut) => {
                log::info!(
                    "[terminal-session] {} no helper within contact window",
                    self.cx.service_id
                );
                self.transition(SessionState::Cancelled);
                return Ok(TerminalOutcome::TimedOut);
            }
            Ok(AcceptOutcome::Cancelled) => {
                self.transition(SessionState::Cancelled);
                return Ok(TerminalOutcome::Cancelled);
            }
            Err(e) => {
                self.transition(SessionState::Failed);
                return Err(e);
            }
        };
        // 1:1 protocol: once the helper is connected the endpoint is done.
        listener.close();
        self.transition(SessionState::Connected);

        if let Err(e) = send_descriptor(&stream, link_fd) {
            self.transition(SessionState::Failed);
            return Err(e);
        }

        match read_status_byte(&stream, &self.cx.cancel) {
            Ok(StatusRead::Byte(code)) => {
                log::debug!(
                    "[terminal-session] {} helper status {code}",
                    self.cx.service_id
                );
                self.transition(SessionState::Completed);
                Ok(TerminalOutcome::Completed(code))
            }
            Ok(StatusRead::NoStatus) => {
                self.transition(SessionState::Cancelled);
                Ok(TerminalOutcome::NoStatus)
            }
            Err(e) => {
                self.transition(SessionState::Failed);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_outcomes_report_effective_code_zero() {
        assert_eq!(TerminalOutcome::TimedOut.effective_code(), 0);
        assert_eq!(TerminalOutcome::Cancelled.effective_code(), 0);
        assert_eq!(TerminalOutcome::NoStatus.effective_code(), 0);
        assert_eq!(TerminalOutcome::Completed(5).effective_code(), 5);
    }
}
