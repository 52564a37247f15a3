//! Diagnostics channel - non-fatal configuration and binding warnings.
//!
//! Every warning the crate produces flows through [`warn`]: it is emitted as
//! a `tracing` warning and fanned out to any handlers registered with
//! [`on_warning`]. Nothing here aborts or propagates - a warning is advice,
//! execution always continues.
//!
//! # Example
//!
//! ```ignore
//! use mq_signals::diag;
//!
//! let cleanup = diag::on_warning(|context, message| {
//!     eprintln!("[{context}] {message}");
//! });
//!
//! // ... later
//! cleanup();
//! ```

use std::cell::RefCell;

use crate::types::Cleanup;

/// Handler receiving `(context, message)` for every warning.
pub type WarningHandler = Box<dyn Fn(&str, &str)>;

struct HandlerRegistry {
    handlers: Vec<(usize, WarningHandler)>,
    next_id: usize,
}

impl HandlerRegistry {
    fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

thread_local! {
    static REGISTRY: RefCell<HandlerRegistry> = RefCell::new(HandlerRegistry {
        handlers: Vec::new(),
        next_id: 0,
    });
}

/// Report a non-fatal warning.
///
/// `context` names the component that noticed the problem (e.g. `"merge"`,
/// `"onmedia"`), `message` is the human-readable diagnostic.
pub fn warn(context: &str, message: &str) {
    tracing::warn!(context, "{message}");

    REGISTRY.with(|reg| {
        let reg = reg.borrow();
        for (_, handler) in &reg.handlers {
            handler(context, message);
        }
    });
}

/// Register a warning handler.
/// Returns a cleanup function that deregisters it.
pub fn on_warning<F>(handler: F) -> Cleanup
where
    F: Fn(&str, &str) + 'static,
{
    let id = REGISTRY.with(|reg| {
        let mut reg = reg.borrow_mut();
        let id = reg.next_id();
        reg.handlers.push((id, Box::new(handler)));
        id
    });

    Box::new(move || {
        REGISTRY.with(|reg| {
            let mut reg = reg.borrow_mut();
            reg.handlers.retain(|(handler_id, _)| *handler_id != id);
        });
    })
}

// =============================================================================
// Tests
// =============================================================================
