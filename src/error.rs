//! Error types for serial-link.
//!
//! `SessionError` is the closed failure set of the rendezvous/terminal
//! subsystem. Timeouts and cooperative cancellation are deliberately *not*
//! errors — the surrounding connection attempt may legitimately be tearing
//! down concurrently — and are reported as soft outcomes instead (see
//! [`crate::rendezvous::AcceptOutcome`] and
//! [`crate::session::TerminalOutcome`]).

use thiserror::Error;

/// Errors produced by the terminal rendezvous subsystem.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Listener creation or bind failed. Propagates immediately, no retry.
    #[error("rendezvous listener setup failed: {message}")]
    Resource {
        /// What was being set up when the failure occurred.
        message: String,
        /// Underlying system error.
        #[source]
        source: std::io::Error,
    },

    /// The helper process could not be started. Propagates immediately;
    /// the orchestration guarantees the listener is released first.
    #[error("helper launch failed: {message}")]
    Launch {
        /// Helper path and context.
        message: String,
        /// Underlying system error.
        #[source]
        source: std::io::Error,
    },

    /// The underlying accept call errored (distinct from timing out).
    #[error("rendezvous accept failed")]
    Accept(#[source] std::io::Error),

    /// Short read/write on the handoff channel, or the peer disconnected
    /// before delivering the status byte. Fails only the terminal session,
    /// never the host process.
    #[error("handoff protocol error: {0}")]
    Protocol(String),
}

/// Convenience alias for subsystem results.
pub type Result<T> = std::result::Result<T, SessionError>;
