//! Query Binder - live signal-backed bindings for raw query strings.
//!
//! [`bind`] calls the injected matcher exactly once per fresh binding and
//! keeps a `Signal<bool>` current through a change listener. The listener is
//! the single writer of the signal; everything else only reads.

use std::cell::Cell;
use std::rc::Rc;

use spark_signals::{Signal, signal};

use crate::viewport::{ListenerId, MediaMatcher, MediaQueryList};

/// Live binding for one alias's raw media-query string.
///
/// The raw string never changes after creation. The binding is shared by
/// `Rc` between the component that created it and any descendant that
/// inherits the alias, so one query string carries one subscription no
/// matter how deep the tree goes.
pub struct BoundQuery {
    raw: String,
    matches: Signal<bool>,
    source: Option<Rc<dyn MediaQueryList>>,
    listener: Cell<Option<ListenerId>>,
}

impl BoundQuery {
    /// The raw query string this binding was created with.
    /// Used for override detection; never changes.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Current match state. Reading inside an effect or derived tracks
    /// the underlying signal.
    pub fn matches(&self) -> bool {
        self.matches.get()
    }

    /// The match-state signal, for building views and deriveds.
    pub fn signal(&self) -> Signal<bool> {
        self.matches.clone()
    }

    /// Deregister the change listener. Idempotent; also runs on drop.
    pub fn unbind(&self) {
        if let (Some(source), Some(id)) = (&self.source, self.listener.take()) {
            source.remove_listener(id);
        }
    }
}

impl Drop for BoundQuery {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl std::fmt::Debug for BoundQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundQuery")
            .field("raw", &self.raw)
            .field("matches", &self.matches.get())
            .finish()
    }
}

/// Bind an alias's raw query string to a live match state.
///
/// With a matcher available this calls `match_media` once, seeds the signal
/// from the current state and registers a change listener that keeps it
/// current. Without one (headless evaluation) the binding is static: it
/// never matches and never updates, but the rest of the system keeps
/// working.
pub fn bind(matcher: Option<&Rc<dyn MediaMatcher>>, alias: &str, raw: &str) -> Rc<BoundQuery> {
    let Some(matcher) = matcher else {
        return Rc::new(BoundQuery {
            raw: raw.to_string(),
            matches: signal(false),
            source: None,
            listener: Cell::new(None),
        });
    };

    tracing::debug!(alias, query = raw, "binding media query");

    let source = matcher.match_media(raw);
    let matches = signal(source.matches());
    let sig = matches.clone();
    let id = source.add_listener(Box::new(move |m| {
        sig.set(m);
    }));

    Rc::new(BoundQuery {
        raw: raw.to_string(),
        matches,
        source: Some(source),
        listener: Cell::new(Some(id)),
    })
}

// =============================================================================
// Tests
// =============================================================================
