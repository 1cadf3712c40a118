//! The serial transport plugin.
//!
//! Installs this transport's handlers on the daemon's hook board and wires
//! the error-code translator into the notifier registry — the Rust analog
//! of a plugin entry point hooking itself ahead of whatever was installed
//! before it.
//!
//! Handler responsibilities:
//!
//! - **device-check**: record the helper codes the daemon should expect for
//!   "user cancelled" and (when redialing) "line busy".
//! - **connect**: resolve the configured modem script (a miss records
//!   `ScriptNotFound` and short-circuits); when the options ask for an
//!   interactive terminal, drive the rendezvous session synchronously and
//!   surface its effective completion code; otherwise continue inward to
//!   previously installed connect logic.
//! - **device-verify**: normalize a bare device name under `/dev/` and
//!   verify the node exists.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::constants::{
    DIR_DEVICES, DIR_SCRIPTS_SYS, DIR_SCRIPTS_USER, HELPER_CODE_BUSY, HELPER_CODE_CANCELLED,
};
use crate::hooks::{ConnectResult, HookBoard, HookFlow};
use crate::launch::HelperLauncher;
use crate::notify::NotifierRegistry;
use crate::session::TerminalSession;
use crate::status::{primary, ConnectionStatus, DeviceStatus};
use crate::translate::register_translator;

/// Install the serial transport's handlers ahead of everything currently on
/// the board.
pub fn install_transport(board: &mut HookBoard, launcher: Arc<dyn HelperLauncher>) {
    board.device_check.install(|cx| {
        // Only the low 8 bits of the helper's exit status survive reaping,
        // so the daemon must match against the truncated cancel code.
        cx.cancel_code = Some(HELPER_CODE_CANCELLED);
        if cx.options.modem_script.is_some() && cx.options.redial_count > 0 {
            cx.busy_code = Some(HELPER_CODE_BUSY);
        }
        Ok(HookFlow::Continue)
    });

    board.connect.install(move |cx| {
        if let Some(name) = cx.options.modem_script.clone() {
            match resolve_script(&name) {
                Some(path) => {
                    log::debug!("[serial] using modem script {}", path.display());
                    cx.modem_script = Some(path);
                }
                None => {
                    log::error!("[serial] could not find modem script '{name}'");
                    cx.status.set_device(DeviceStatus::ScriptNotFound);
                    cx.status.set_primary(primary::CONNECT_FAILED);
                    return Ok(HookFlow::Stop(ConnectResult { status: -1, error_code: 0 }));
                }
            }
        }

        if cx.options.needs_terminal() {
            let Some(link_fd) = cx.link_fd else {
                log::error!("[serial] terminal session requested without a link descriptor");
                cx.status.set_primary(primary::TERMINAL_FAILED);
                return Ok(HookFlow::Stop(ConnectResult { status: -1, error_code: 0 }));
            };
            let helper = cx.helper_path.clone();

            let outcome = {
                let mut session = TerminalSession::new(cx, launcher.as_ref());
                session.run(&helper, link_fd)
            };
            match outcome {
                Ok(outcome) => {
                    let code = outcome.effective_code();
                    cx.terminal_code = Some(code);
                    if code != 0 {
                        cx.status.set_primary(primary::CONNECT_FAILED);
                        return Ok(HookFlow::Stop(ConnectResult {
                            status: -1,
                            error_code: i32::from(code),
                        }));
                    }
                }
                Err(e) => {
                    log::error!("[serial] terminal session failed: {e}");
                    cx.status.set_primary(primary::TERMINAL_FAILED);
                    return Ok(HookFlow::Stop(ConnectResult { status: -1, error_code: 0 }));
                }
            }
        }

        Ok(HookFlow::Continue)
    });

    board.device_verify.install(|cx| {
        if let Some(name) = cx.options.device.clone() {
            let resolved = resolve_device_name(&name);
            match fs::metadata(&resolved) {
                Ok(_) => cx.device = Some(resolved),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    cx.status.set_primary(primary::DEVICE_ERROR);
                    anyhow::bail!("device '{}' does not exist", resolved.display());
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("stat device {}", resolved.display()));
                }
            }
        }
        Ok(HookFlow::Continue)
    });
}

/// Subscribe this transport's translator to the lifecycle events.
pub fn wire_notifiers(registry: &mut NotifierRegistry, status: &Arc<ConnectionStatus>) {
    register_translator(registry, status);
}

/// Resolve a device name to a filesystem node path.
///
/// Absolute names are taken as-is. Bare names live under `/dev/` and get a
/// `cu.` prefix unless they already name a dial-in tty (`ttyd…`).
pub fn resolve_device_name(name: &str) -> PathBuf {
    if name.starts_with('/') {
        return PathBuf::from(name);
    }
    let mut node = String::from(DIR_DEVICES);
    if !name.starts_with("ttyd") {
        node.push_str("cu.");
    }
    node.push_str(name);
    PathBuf::from(node)
}

/// Resolve a modem script name against the system then per-machine script
/// directories. Absolute paths are checked directly.
pub fn resolve_script(name: &str) -> Option<PathBuf> {
    resolve_script_in(
        name,
        &[Path::new(DIR_SCRIPTS_SYS), Path::new(DIR_SCRIPTS_USER)],
    )
}

fn resolve_script_in(name: &str, search_dirs: &[&Path]) -> Option<PathBuf> {
    if name.starts_with('/') {
        let path = PathBuf::from(name);
        return path.exists().then_some(path);
    }
    search_dirs.iter().map(|dir| dir.join(name)).find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SerialOptions;
    use crate::context::SessionContext;
    use std::ffi::OsString;

    struct NoopLauncher;
    impl HelperLauncher for NoopLauncher {
        fn launch_async(&self, _program: &Path, _args: &[OsString]) -> io::Result<()> {
            Ok(())
        }
    }

    fn board_with_transport() -> HookBoard {
        let mut board = HookBoard::new();
        install_transport(&mut board, Arc::new(NoopLauncher));
        board
    }

    #[test]
    fn device_names_resolve_under_dev() {
        assert_eq!(resolve_device_name("modem"), PathBuf::from("/dev/cu.modem"));
        assert_eq!(resolve_device_name("ttyd1"), PathBuf::from("/dev/ttyd1"));
        assert_eq!(resolve_device_name("/dev/custom"), PathBuf::from("/dev/custom"));
    }

    #[test]
    fn script_search_prefers_the_first_directory() {
        let sys = tempfile::tempdir().expect("tempdir");
        let user = tempfile::tempdir().expect("tempdir");
        fs::write(sys.path().join("Modem"), "sys").expect("write");
        fs::write(user.path().join("Modem"), "user").expect("write");

        let found = resolve_script_in("Modem", &[sys.path(), user.path()]).expect("found");
        assert_eq!(found, sys.path().join("Modem"));

        let fallback = resolve_script_in("Other", &[sys.path(), user.path()]);
        assert_eq!(fallback, None);
    }

    #[test]
    fn missing_modem_script_stops_the_connect_chain() {
        let board = board_with_transport();
        let mut options = SerialOptions::default();
        options.modem_script = Some("definitely-not-installed-script".into());
        let mut cx = SessionContext::new("svc", options);

        let result = board.connect.run(&mut cx).expect("connect chain");
        assert_eq!(result.status, -1);
        assert_eq!(cx.status.device(), Some(DeviceStatus::ScriptNotFound));
        assert_eq!(cx.status.primary(), primary::CONNECT_FAILED);
    }

    #[test]
    fn absolute_modem_script_is_resolved_into_the_context() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("Null Modem");
        fs::write(&script, "! script").expect("write");

        let board = board_with_transport();
        let mut options = SerialOptions::default();
        options.modem_script = Some(script.to_string_lossy().into_owned());
        let mut cx = SessionContext::new("svc", options);

        let result = board.connect.run(&mut cx).expect("connect chain");
        assert_eq!(result, ConnectResult::default());
        assert_eq!(cx.modem_script.as_deref(), Some(script.as_path()));
    }

    #[test]
    fn device_check_records_expected_helper_codes() {
        let board = board_with_transport();
        let mut options = SerialOptions::default();
        options.modem_script = Some("Modem".into());
        options.redial_count = 3;
        let mut cx = SessionContext::new("svc", options);

        board.device_check.run(&mut cx).expect("device check");
        assert_eq!(cx.cancel_code, Some(HELPER_CODE_CANCELLED));
        assert_eq!(cx.busy_code, Some(HELPER_CODE_BUSY));
    }

    #[test]
    fn device_verify_rejects_a_missing_node() {
        let board = board_with_transport();
        let mut options = SerialOptions::default();
        options.device = Some("no-such-serial-device".into());
        let mut cx = SessionContext::new("svc", options);

        assert!(board.device_verify.run(&mut cx).is_err());
        assert_eq!(cx.status.primary(), primary::DEVICE_ERROR);
    }

    #[test]
    fn terminal_without_link_descriptor_fails_soft_into_status() {
        let board = board_with_transport();
        let mut options = SerialOptions::default();
        options.terminal_window = true;
        let mut cx = SessionContext::new("svc", options);
        // Keep the rendezvous socket out of /var/run for the test.
        let dir = tempfile::tempdir().expect("tempdir");
        cx.rendezvous_path = dir.path().join("term.sock");

        let result = board.connect.run(&mut cx).expect("connect chain");
        assert_eq!(result.status, -1);
        assert_eq!(cx.status.primary(), primary::TERMINAL_FAILED);
    }
}
