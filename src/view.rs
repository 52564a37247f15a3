//! Resolved Match View - the reactive alias -> bool mapping (`$mq`).
//!
//! One `Signal<bool>` per alias gives fine-grained tracking: an effect that
//! reads `view.matches("desktop")` re-runs only when `desktop` flips. The
//! `all` view is a derived over every entry, recomputed whenever any
//! constituent match changes.

use std::rc::Rc;

use spark_signals::{Derived, Signal, derived};

/// Reactive alias -> match mapping exposed to consumers.
///
/// Created at mount from the instance's bindings and destroyed with the
/// instance. A component without own declarations shares its parent's view
/// by `Rc`, so there is exactly one view per declaration scope.
pub struct MatchView {
    entries: Vec<(String, Signal<bool>)>,
    all: Derived<Vec<String>>,
}

impl MatchView {
    /// Build a view over `(alias, match signal)` pairs, in scope order.
    pub fn new(entries: Vec<(String, Signal<bool>)>) -> Rc<Self> {
        let snapshot = entries.clone();
        let all = derived(move || {
            snapshot
                .iter()
                .filter(|(_, sig)| sig.get())
                .map(|(alias, _)| alias.clone())
                .collect::<Vec<String>>()
        });

        Rc::new(Self { entries, all })
    }

    /// An empty view: the pre-mount placeholder.
    pub fn empty() -> Rc<Self> {
        Self::new(Vec::new())
    }

    /// Current match state for an alias; `false` for unknown aliases.
    /// Reading inside an effect or derived tracks that alias's signal.
    pub fn matches(&self, alias: &str) -> bool {
        self.signal(alias).map(|sig| sig.get()).unwrap_or(false)
    }

    /// The match signal for an alias, for building watchers and deriveds.
    pub fn signal(&self, alias: &str) -> Option<Signal<bool>> {
        self.entries
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, sig)| sig.clone())
    }

    /// The aliases currently matching, in scope order. Reactive: reading
    /// inside an effect tracks every entry.
    pub fn all(&self) -> Vec<String> {
        self.all.get()
    }

    /// Alias names in scope order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(a, _)| a.as_str())
    }

    /// Whether an alias is part of this view.
    pub fn contains(&self, alias: &str) -> bool {
        self.entries.iter().any(|(a, _)| a == alias)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for MatchView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (alias, sig) in &self.entries {
            map.entry(alias, &sig.get());
        }
        map.finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
