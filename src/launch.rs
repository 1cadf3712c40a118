//! Helper process launching.
//!
//! The terminal helper is launched fire-and-forget: no exit-code tracking
//! and no reaping. Its completion is conveyed exclusively through the
//! rendezvous socket — it connects, receives the descriptor handoff, and
//! writes back one status byte. The launcher is a trait so orchestration
//! tests can substitute an in-process helper.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

/// Starts the terminal helper asynchronously.
pub trait HelperLauncher: Send + Sync {
    /// Launch `program` with `args`, returning as soon as the process is
    /// started. The helper's outcome is never observed through this trait.
    fn launch_async(&self, program: &Path, args: &[OsString]) -> io::Result<()>;
}

/// Production launcher backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandLauncher;

impl HelperLauncher for CommandLauncher {
    fn launch_async(&self, program: &Path, args: &[OsString]) -> io::Result<()> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        log::debug!(
            "[launch] started helper {} (pid {})",
            program.display(),
            child.id()
        );
        // The child handle is dropped without waiting: completion arrives
        // through the rendezvous socket, not the exit status.
        drop(child);
        Ok(())
    }
}
