//! Lifecycle event notifier registry.
//!
//! Subscribers register a callback for an event kind; `fire` delivers the
//! event to every subscriber for that kind in registration order, passing
//! the event's numeric code. A failing callback is logged and skipped —
//! dispatch always reaches the remaining subscribers. Registrations live as
//! long as the registry, which is bound to the session or process that owns
//! it.

use anyhow::Result;

/// Lifecycle events a transport can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The connect phase failed; carries a transport-specific code.
    ConnectFailed,
    /// The link layer went down; carries no meaningful code.
    LinkDown,
}

/// Subscriber callback; receives the event's numeric code.
pub type NotifyCallback = Box<dyn Fn(i32) -> Result<()> + Send>;

struct Entry {
    /// Subscriber name, for dispatch failure logs.
    name: &'static str,
    callback: NotifyCallback,
}

/// Multicast registry for lifecycle events.
#[derive(Default)]
pub struct NotifierRegistry {
    connect_failed: Vec<Entry>,
    link_down: Vec<Entry>,
}

impl std::fmt::Debug for NotifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierRegistry")
            .field("connect_failed", &self.connect_failed.len())
            .field("link_down", &self.link_down.len())
            .finish()
    }
}

impl NotifierRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `callback` to `kind`. `name` identifies the subscriber in
    /// dispatch failure logs.
    pub fn register<F>(&mut self, kind: EventKind, name: &'static str, callback: F)
    where
        F: Fn(i32) -> Result<()> + Send + 'static,
    {
        let entry = Entry { name, callback: Box::new(callback) };
        match kind {
            EventKind::ConnectFailed => self.connect_failed.push(entry),
            EventKind::LinkDown => self.link_down.push(entry),
        }
    }

    /// Deliver `kind` with `code` to every subscriber, in registration order.
    ///
    /// A callback error is local: it is logged and the remaining subscribers
    /// still run.
    pub fn fire(&self, kind: EventKind, code: i32) {
        let entries = match kind {
            EventKind::ConnectFailed => &self.connect_failed,
            EventKind::LinkDown => &self.link_down,
        };
        for entry in entries {
            if let Err(err) = (entry.callback)(code) {
                log::warn!("[notify] {:?} handler '{}' failed: {err:#}", kind, entry.name);
            }
        }
    }

    /// Number of subscribers for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::ConnectFailed => self.connect_failed.len(),
            EventKind::LinkDown => self.link_down.len(),
        }
    }
}
