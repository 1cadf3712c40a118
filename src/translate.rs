//! Helper error-code translation.
//!
//! Pure adapter between the modem-scripting engine's numeric error codes and
//! the transport failure taxonomy in [`crate::status::DeviceStatus`]. It
//! never parses scripting output itself — it only reacts to lifecycle events
//! carrying codes the engine already produced.

use std::sync::Arc;

use crate::constants::{
    HELPER_CODE_BUSY, HELPER_CODE_MODEM_ERROR, HELPER_CODE_NO_ANSWER, HELPER_CODE_NO_CARRIER,
    HELPER_CODE_NO_DIAL_TONE, HELPER_CODE_NO_NUMBER,
};
use crate::notify::{EventKind, NotifierRegistry};
use crate::status::{primary, ConnectionStatus, DeviceStatus};

/// Helper code → failure reason table.
///
/// Codes absent from this table leave the recorded status untouched.
const CODE_TABLE: &[(i32, DeviceStatus)] = &[
    (HELPER_CODE_NO_NUMBER, DeviceStatus::NoNumber),
    (HELPER_CODE_NO_ANSWER, DeviceStatus::NoAnswer),
    (HELPER_CODE_BUSY, DeviceStatus::Busy),
    (HELPER_CODE_NO_CARRIER, DeviceStatus::NoCarrier),
    (HELPER_CODE_NO_DIAL_TONE, DeviceStatus::NoDialTone),
    (HELPER_CODE_MODEM_ERROR, DeviceStatus::GenericError),
];

/// Translate a connect-failure code into the shared status record.
///
/// Unmapped codes are a no-op: whatever reason was recorded earlier stands.
pub fn translate_connect_failure(status: &ConnectionStatus, code: i32) {
    if let Some((_, reason)) = CODE_TABLE.iter().find(|(c, _)| *c == code) {
        log::debug!("[translate] helper code {code} -> {reason:?}");
        status.set_device(*reason);
    }
}

/// React to the link layer going down.
///
/// If the aggregate status already says the link was hung up, record the
/// transport-specific hangup reason so the daemon presents it correctly.
pub fn translate_link_down(status: &ConnectionStatus) {
    if status.primary() == primary::HANGUP {
        status.set_device(DeviceStatus::Hangup);
    }
}

/// Subscribe the translator to the registry's failure and teardown events.
pub fn register_translator(registry: &mut NotifierRegistry, status: &Arc<ConnectionStatus>) {
    let shared = Arc::clone(status);
    registry.register(EventKind::ConnectFailed, "code-translator", move |code| {
        translate_connect_failure(&shared, code);
        Ok(())
    });

    let shared = Arc::clone(status);
    registry.register(EventKind::LinkDown, "hangup-translator", move |_code| {
        translate_link_down(&shared);
        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_each_helper_code() {
        let cases = [
            (122, DeviceStatus::Busy),
            (123, DeviceStatus::NoCarrier),
            (124, DeviceStatus::NoDialTone),
            (117, DeviceStatus::NoNumber),
            (121, DeviceStatus::NoAnswer),
            (125, DeviceStatus::GenericError),
        ];
        for (code, expected) in cases {
            let status = ConnectionStatus::new();
            translate_connect_failure(&status, code);
            assert_eq!(status.device(), Some(expected), "code {code}");
        }
    }

    #[test]
    fn unmapped_code_leaves_status_untouched() {
        let status = ConnectionStatus::new();
        status.set_device(DeviceStatus::Busy);
        translate_connect_failure(&status, 999);
        assert_eq!(status.device(), Some(DeviceStatus::Busy));

        let clean = ConnectionStatus::new();
        translate_connect_failure(&clean, 120);
        assert_eq!(clean.device(), None);
    }

    #[test]
    fn link_down_translates_hangup_only() {
        let status = ConnectionStatus::new();
        translate_link_down(&status);
        assert_eq!(status.device(), None);

        status.set_primary(primary::HANGUP);
        translate_link_down(&status);
        assert_eq!(status.device(), Some(DeviceStatus::Hangup));
    }

    #[test]
    fn registered_translator_fires_through_registry() {
        let status = Arc::new(ConnectionStatus::new());
        let mut registry = NotifierRegistry::new();
        register_translator(&mut registry, &status);

        registry.fire(EventKind::ConnectFailed, 124);
        assert_eq!(status.device(), Some(DeviceStatus::NoDialTone));

        status.set_primary(primary::HANGUP);
        registry.fire(EventKind::LinkDown, 0);
        assert_eq!(status.device(), Some(DeviceStatus::Hangup));
    }
}
