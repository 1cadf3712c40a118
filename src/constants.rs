//! Application-wide constants for serial-link.
//!
//! This module centralizes magic numbers and fixed paths so they are
//! discoverable in one place. Constants are grouped by domain with
//! documentation explaining their purpose.
//!
//! # Categories
//!
//! - **Timeouts**: rendezvous contact window and polling intervals
//! - **Paths**: rendezvous socket, helper executable, script directories
//! - **Helper codes**: numeric codes reported by the modem-scripting engine

use std::time::Duration;

// ============================================================================
// Timeouts
// ============================================================================

/// How long a launched terminal helper has to contact the rendezvous socket.
///
/// The deadline is absolute — fixed at session start and never extended.
/// 30 seconds covers application startup on a loaded machine while still
/// bounding a helper that never comes up.
pub const CONTACT_TIMEOUT: Duration = Duration::from_secs(30);

/// Polling interval for the accept-with-deadline loop.
///
/// Cancellation is cooperative: the blocking accept notices the cancel flag
/// only at a wake-up, so this interval bounds cancellation latency.
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Read-timeout interval for the status-byte wait.
///
/// The status read has no overall deadline, but it re-checks the cancel flag
/// every time this interval elapses without data.
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(250);

// ============================================================================
// Paths
// ============================================================================

/// Maximum path length for a Unix domain socket (macOS kernel limit).
pub const MAX_SOCK_PATH: usize = 104;

/// Fixed filesystem path of the terminal-helper rendezvous socket.
///
/// Created when a terminal session starts and removed when it ends; the
/// helper receives this path as its sole argument and connects to it.
pub const RENDEZVOUS_SOCKET_PATH: &str = "/var/run/serial-link-term";

/// Default location of the terminal-helper executable.
pub const TERMINAL_HELPER_PATH: &str = "/usr/libexec/serial-link-term-helper";

/// System-wide modem script directory, searched first.
pub const DIR_SCRIPTS_SYS: &str = "/System/Library/Modem Scripts/";

/// Per-machine modem script directory, searched second.
pub const DIR_SCRIPTS_USER: &str = "/Library/Modem Scripts/";

/// Terminal script directory.
pub const DIR_SCRIPTS_TERMINAL: &str = "/Library/Terminal Scripts/";

/// Device node directory prefixed to bare device names.
pub const DIR_DEVICES: &str = "/dev/";

// ============================================================================
// Helper codes
// ============================================================================

/// Script engine: dial string was empty.
pub const HELPER_CODE_NO_NUMBER: i32 = 117;

/// Script engine: remote end did not answer.
pub const HELPER_CODE_NO_ANSWER: i32 = 121;

/// Script engine: line busy.
pub const HELPER_CODE_BUSY: i32 = 122;

/// Script engine: no carrier detected.
pub const HELPER_CODE_NO_CARRIER: i32 = 123;

/// Script engine: no dial tone.
pub const HELPER_CODE_NO_DIAL_TONE: i32 = 124;

/// Script engine: modem not responding.
pub const HELPER_CODE_MODEM_ERROR: i32 = 125;

/// Script engine: user cancelled the script.
///
/// Only the low 8 bits of the helper's exit status survive process reaping,
/// so this is the truncated form of the engine's cancel error.
pub const HELPER_CODE_CANCELLED: i32 = 136;
