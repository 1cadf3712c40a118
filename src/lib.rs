//! serial-link — connection-establishment core for a point-to-point link
//! daemon with pluggable transport back ends.
//!
//! Two tightly coupled mechanisms live here:
//!
//! - **Hook chaining** — ordered interception letting a transport plugin
//!   insert connection-setup logic ahead of previously installed plugins
//!   while still delegating inward ([`hooks`], [`serial`]).
//! - **Terminal rendezvous** — a local protocol that hands a live
//!   data-stream descriptor to a freshly launched helper process and reads
//!   back a one-byte completion status ([`rendezvous`], [`session`]).
//!
//! # Architecture
//!
//! ```text
//! connect attempt ──► HookBoard::connect ──► serial transport handler
//!                                                │
//!                        terminal needed? ──────►│ TerminalSession
//!                                                │   bind → launch helper →
//!                                                │   accept (30 s, cancellable) →
//!                                                │   SCM_RIGHTS handoff → status byte
//!                                                ▼
//!                                         chain continues inward
//!
//! async events ──► NotifierRegistry ──► ErrorCodeTranslator ──► ConnectionStatus
//! ```
//!
//! Concurrency model: one blocking call in flight, cooperatively cancelled.
//! No worker threads are spawned; the launched helper and the asynchronous
//! event source run concurrently with the session and may set the
//! [`CancelFlag`] at any time, which every blocking call observes at its
//! next wake-up.
//!
//! # Modules
//!
//! - [`hooks`] - extension points and the chain runner
//! - [`notify`] - lifecycle event fan-out
//! - [`translate`] - helper error-code translation
//! - [`rendezvous`] - listener lifecycle and descriptor handoff
//! - [`session`] - terminal-session orchestration
//! - [`serial`] - the serial transport plugin itself

pub mod cancel;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod hooks;
pub mod launch;
pub mod notify;
pub mod rendezvous;
pub mod serial;
pub mod session;
pub mod status;
pub mod translate;

// Re-export commonly used types
pub use cancel::CancelFlag;
pub use config::{DialMode, SerialOptions};
pub use context::SessionContext;
pub use error::SessionError;
pub use hooks::{ConnectResult, HookBoard, HookChain, HookFlow};
pub use launch::{CommandLauncher, HelperLauncher};
pub use notify::{EventKind, NotifierRegistry};
pub use rendezvous::handoff::{
    read_status_byte, recv_descriptor, send_descriptor, send_failure, Handoff, StatusRead,
};
pub use rendezvous::{AcceptOutcome, RendezvousListener};
pub use session::{SessionState, TerminalOutcome, TerminalSession};
pub use status::{ConnectionStatus, DeviceStatus};
