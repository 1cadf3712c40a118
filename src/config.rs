//! Serial transport options: loading and persistence.
//!
//! The daemon's option table is parsed elsewhere; this is the materialized
//! result handed to the transport at connection-attempt start. Options can
//! also be loaded from / saved to a JSON file for standalone use.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Dialing mode for the modem script.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DialMode {
    /// Wait for a dial tone before dialing.
    #[default]
    Normal,
    /// Dial without waiting for a dial tone.
    Blind,
    /// The user dials by hand.
    Manual,
}

/// Options controlling the serial transport for one connection attempt.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SerialOptions {
    /// Device name; bare names are resolved under `/dev/` by device-verify.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Modem script name or absolute path; `None` disables scripted dialing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modem_script: Option<String>,
    /// Play connection progress through the modem speaker.
    pub modem_sound: bool,
    /// Request modem error correction.
    pub modem_reliable: bool,
    /// Request modem data compression.
    pub modem_compress: bool,
    /// Pulse dialing instead of tone dialing.
    pub modem_pulse: bool,
    /// Dialing mode.
    pub dial_mode: DialMode,
    /// Number of redial attempts after a busy line.
    pub redial_count: u32,
    /// Terminal script name; mutually optional with `terminal_window`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_script: Option<String>,
    /// Pop up an interactive terminal window during connect.
    pub terminal_window: bool,
}

impl Default for SerialOptions {
    fn default() -> Self {
        Self {
            device: None,
            modem_script: None,
            modem_sound: true,
            modem_reliable: true,
            modem_compress: true,
            modem_pulse: false,
            dial_mode: DialMode::Normal,
            redial_count: 0,
            terminal_script: None,
            terminal_window: false,
        }
    }
}

impl SerialOptions {
    /// Whether the connect phase needs an interactive terminal session.
    pub fn needs_terminal(&self) -> bool {
        self.terminal_window || self.terminal_script.is_some()
    }

    /// Load options from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("read options file: {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("parse options file: {}", path.display()))
    }

    /// Save options to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("serialize options")?;
        fs::write(path, data).with_context(|| format!("write options file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_modem_conventions() {
        let opts = SerialOptions::default();
        assert!(opts.modem_sound);
        assert!(opts.modem_reliable);
        assert!(opts.modem_compress);
        assert!(!opts.modem_pulse);
        assert_eq!(opts.dial_mode, DialMode::Normal);
        assert!(!opts.needs_terminal());
    }

    #[test]
    fn terminal_needed_for_window_or_script() {
        let mut opts = SerialOptions::default();
        opts.terminal_window = true;
        assert!(opts.needs_terminal());

        let mut opts = SerialOptions::default();
        opts.terminal_script = Some("Direct".into());
        assert!(opts.needs_terminal());
    }

    #[test]
    fn round_trips_through_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("options.json");

        let mut opts = SerialOptions::default();
        opts.device = Some("modem".into());
        opts.modem_script = Some("Apple Internal 56K".into());
        opts.dial_mode = DialMode::Blind;
        opts.save(&path).expect("save");

        let loaded = SerialOptions::load(&path).expect("load");
        assert_eq!(loaded.device.as_deref(), Some("modem"));
        assert_eq!(loaded.modem_script.as_deref(), Some("Apple Internal 56K"));
        assert_eq!(loaded.dial_mode, DialMode::Blind);
    }
}
