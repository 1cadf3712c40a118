//! Transport hook chains.
//!
//! The daemon exposes three extension points a transport plugin can hook:
//! device-check (pre-flight option fixups), connect (device setup and the
//! optional interactive terminal step), and device-verify (device node
//! validation). Several independently installed plugins may hook the same
//! point; the most recently installed handler runs first and the chain
//! continues inward to earlier handlers.
//!
//! Chaining is owned by the runner, not by handler discipline: a handler
//! returns [`HookFlow::Continue`] to delegate inward or
//! [`HookFlow::Stop`] to short-circuit with a result. A handler therefore
//! cannot accidentally "forget" to call its predecessor.

// Rust guideline compliant 2026-02

use anyhow::Result;

use crate::context::SessionContext;

/// What a hook handler wants the chain to do next.
#[derive(Debug)]
pub enum HookFlow<T> {
    /// This handler is done; continue inward to the previously installed one.
    Continue,
    /// Short-circuit the chain with this result.
    Stop(T),
}

/// Result of running the connect chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectResult {
    /// 0 on success, negative on failure (daemon convention).
    pub status: i32,
    /// Transport-specific error code accompanying a failure.
    pub error_code: i32,
}

/// Boxed hook handler for one operation kind.
pub type Handler<T> = Box<dyn Fn(&mut SessionContext) -> Result<HookFlow<T>> + Send>;

/// Ordered list of handlers for one extension point.
///
/// Installation order is preserved; invocation order is newest-first, so a
/// later plugin wraps everything installed before it. An empty (or fully
/// delegating) chain yields `T::default()` — the terminating no-op.
pub struct HookChain<T> {
    handlers: Vec<Handler<T>>,
}

impl<T> std::fmt::Debug for HookChain<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookChain")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl<T> Default for HookChain<T> {
    fn default() -> Self {
        Self { handlers: Vec::new() }
    }
}

impl<T: Default> HookChain<T> {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a handler ahead of everything installed so far.
    pub fn install<F>(&mut self, handler: F)
    where
        F: Fn(&mut SessionContext) -> Result<HookFlow<T>> + Send + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Number of installed handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is installed.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the chain: newest handler first, continuing inward until a
    /// handler stops or the chain runs out.
    pub fn run(&self, cx: &mut SessionContext) -> Result<T> {
        for handler in self.handlers.iter().rev() {
            match handler(cx)? {
                HookFlow::Continue => {}
                HookFlow::Stop(value) => return Ok(value),
            }
        }
        Ok(T::default())
    }
}

/// The three extension points the daemon exposes to transport plugins.
#[derive(Debug, Default)]
pub struct HookBoard {
    /// Pre-flight option fixups; runs before the connect phase.
    pub device_check: HookChain<()>,
    /// Device setup and the optional interactive terminal step.
    pub connect: HookChain<ConnectResult>,
    /// Device node validation.
    pub device_verify: HookChain<()>,
}

impl HookBoard {
    /// Create a board with all chains empty.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SerialOptions;
    use std::sync::{Arc, Mutex};

    fn test_context() -> SessionContext {
        SessionContext::new("test-service", SerialOptions::default())
    }

    #[test]
    fn empty_chain_yields_default() {
        let chain: HookChain<ConnectResult> = HookChain::new();
        let mut cx = test_context();
        let result = chain.run(&mut cx).expect("empty chain");
        assert_eq!(result, ConnectResult::default());
    }

    #[test]
    fn newest_handler_runs_first_then_chain_continues_inward() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut chain: HookChain<()> = HookChain::new();

        let trace = Arc::clone(&order);
        chain.install(move |_cx| {
            trace.lock().expect("order lock").push("a");
            Ok(HookFlow::Continue)
        });
        let trace = Arc::clone(&order);
        chain.install(move |_cx| {
            trace.lock().expect("order lock").push("b");
            Ok(HookFlow::Continue)
        });

        let mut cx = test_context();
        chain.run(&mut cx).expect("run");
        assert_eq!(*order.lock().expect("order lock"), vec!["b", "a"]);
    }

    #[test]
    fn stop_short_circuits_inner_handlers() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut chain: HookChain<ConnectResult> = HookChain::new();

        let trace = Arc::clone(&order);
        chain.install(move |_cx| {
            trace.lock().expect("order lock").push("inner");
            Ok(HookFlow::Continue)
        });
        let trace = Arc::clone(&order);
        chain.install(move |_cx| {
            trace.lock().expect("order lock").push("outer");
            Ok(HookFlow::Stop(ConnectResult { status: -1, error_code: 42 }))
        });

        let mut cx = test_context();
        let result = chain.run(&mut cx).expect("run");
        assert_eq!(result.status, -1);
        assert_eq!(result.error_code, 42);
        assert_eq!(*order.lock().expect("order lock"), vec!["outer"]);
    }

    #[test]
    fn handler_error_propagates() {
        let mut chain: HookChain<()> = HookChain::new();
        chain.install(|_cx| anyhow::bail!("device exploded"));
        let mut cx = test_context();
        assert!(chain.run(&mut cx).is_err());
    }
}
