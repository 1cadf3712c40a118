//! Shared connection status record and the transport failure taxonomy.
//!
//! `ConnectionStatus` is the `{primary, device}` pair the surrounding daemon
//! reads to decide retry/redial and to present a failure reason. It is
//! written both by the orchestration path and by notifier callbacks fired
//! from unrelated asynchronous protocol events, so it uses relaxed atomics:
//! last write wins, readers see an eventually consistent value, and no lock
//! protects the pair as a unit.

use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};

// ============================================================================
// Primary status codes
// ============================================================================

/// Daemon-level status codes written to [`ConnectionStatus::set_primary`].
pub mod primary {
    /// No failure recorded.
    pub const OK: i32 = 0;
    /// Device node missing or unusable.
    pub const DEVICE_ERROR: i32 = 3;
    /// The connect phase failed; the device code carries the reason.
    pub const CONNECT_FAILED: i32 = 5;
    /// The interactive terminal step failed.
    pub const TERMINAL_FAILED: i32 = 6;
    /// The established link was hung up.
    pub const HANGUP: i32 = 7;
}

// ============================================================================
// Device failure taxonomy
// ============================================================================

/// Closed set of transport-specific failure reasons.
///
/// The discriminants are the wire/status values published to the daemon;
/// they occupy bits 8..15 of the externally visible last-cause key and must
/// not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceStatus {
    /// No carrier detected.
    NoCarrier = 1,
    /// Dial string was empty.
    NoNumber = 2,
    /// Line busy.
    Busy = 3,
    /// No dial tone.
    NoDialTone = 4,
    /// Modem error, modem not responding.
    GenericError = 5,
    /// No answer from the remote end.
    NoAnswer = 6,
    /// Link was hung up after coming up.
    Hangup = 7,
    /// Configured modem script could not be found.
    ScriptNotFound = 8,
}

impl DeviceStatus {
    /// Numeric status value published to the daemon.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Reverse lookup from a published status value.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::NoCarrier),
            2 => Some(Self::NoNumber),
            3 => Some(Self::Busy),
            4 => Some(Self::NoDialTone),
            5 => Some(Self::GenericError),
            6 => Some(Self::NoAnswer),
            7 => Some(Self::Hangup),
            8 => Some(Self::ScriptNotFound),
            _ => None,
        }
    }
}

// ============================================================================
// Shared status record
// ============================================================================

/// Shared `{primary, device}` status record.
///
/// Writers are the orchestration path and notifier callbacks; the daemon is
/// the reader. Last-write-wins, no merge semantics. A device code of zero
/// means "no transport-specific reason recorded".
#[derive(Debug, Default)]
pub struct ConnectionStatus {
    primary: AtomicI32,
    device: AtomicU8,
}

impl ConnectionStatus {
    /// Fresh record with no failure recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the daemon-level status (one of [`primary`]'s constants).
    pub fn set_primary(&self, status: i32) {
        self.primary.store(status, Ordering::Relaxed);
    }

    /// Current daemon-level status.
    pub fn primary(&self) -> i32 {
        self.primary.load(Ordering::Relaxed)
    }

    /// Record a transport-specific failure reason.
    pub fn set_device(&self, status: DeviceStatus) {
        self.device.store(status.code(), Ordering::Relaxed);
    }

    /// Current transport-specific failure reason, if one was recorded.
    pub fn device(&self) -> Option<DeviceStatus> {
        DeviceStatus::from_code(self.device.load(Ordering::Relaxed))
    }
}
