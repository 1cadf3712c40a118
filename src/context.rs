//! Per-connection-attempt session context.
//!
//! Every operation in the subsystem takes a `SessionContext` instead of
//! consulting process-wide mutable state. The context is created when a
//! connection attempt starts and dropped when it ends; hook handlers write
//! their resolved results (device path, script path, expected codes) into it
//! so later phases and the daemon can read them.

use std::os::unix::io::RawFd;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cancel::CancelFlag;
use crate::config::SerialOptions;
use crate::constants::{RENDEZVOUS_SOCKET_PATH, TERMINAL_HELPER_PATH};
use crate::status::ConnectionStatus;

/// State for one connection attempt, passed to every hook and session
/// operation.
#[derive(Debug)]
pub struct SessionContext {
    /// Configuration service identifier, used in log tags and helper args.
    pub service_id: String,
    /// Transport options for this attempt.
    pub options: SerialOptions,
    /// Shared status record; also written by notifier callbacks on other
    /// threads, so it lives behind an `Arc`.
    pub status: Arc<ConnectionStatus>,
    /// Cooperative cancellation for every blocking call in this attempt.
    pub cancel: CancelFlag,
    /// Rendezvous socket path for the terminal helper.
    pub rendezvous_path: PathBuf,
    /// Terminal-helper executable.
    pub helper_path: PathBuf,
    /// Link data-stream descriptor to hand to the terminal helper.
    ///
    /// Set by the daemon once the physical device is open; required when
    /// the options ask for an interactive terminal session.
    pub link_fd: Option<RawFd>,
    /// Device node resolved by the device-verify hook.
    pub device: Option<PathBuf>,
    /// Modem script resolved by the connect hook.
    pub modem_script: Option<PathBuf>,
    /// Helper code the daemon should treat as "line busy" when redialing.
    pub busy_code: Option<i32>,
    /// Helper code the daemon should treat as "user cancelled".
    pub cancel_code: Option<i32>,
    /// Effective completion code of the interactive terminal step.
    pub terminal_code: Option<u8>,
}

impl SessionContext {
    /// Create a context for a new connection attempt.
    pub fn new(service_id: impl Into<String>, options: SerialOptions) -> Self {
        Self {
            service_id: service_id.into(),
            options,
            status: Arc::new(ConnectionStatus::new()),
            cancel: CancelFlag::new(),
            rendezvous_path: PathBuf::from(RENDEZVOUS_SOCKET_PATH),
            helper_path: PathBuf::from(TERMINAL_HELPER_PATH),
            link_fd: None,
            device: None,
            modem_script: None,
            busy_code: None,
            cancel_code: None,
            terminal_code: None,
        }
    }
}
