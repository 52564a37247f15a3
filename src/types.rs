//! Core types shared across the crate.

// =============================================================================
// Cleanup Function
// =============================================================================

/// Cleanup function returned by bindings and subscriptions.
/// Call it to tear down whatever was registered.
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// Query Declarations
// =============================================================================

/// The static media-query declarations of one component definition.
///
/// An ordered mapping from alias name to raw media-query string, plus the
/// `isolated` flag that discards every inherited alias. Declarations are
/// attached to an instance at creation time and never change afterwards.
///
/// # Example
///
/// ```ignore
/// use mq_signals::MqOptions;
///
/// let opts = MqOptions::new()
///     .query("tablet", "(max-width: 1024px)")
///     .query("desktop", "(min-width: 1024px)");
/// ```
#[derive(Clone, Debug, Default)]
pub struct MqOptions {
    queries: Vec<(String, String)>,
    isolated: bool,
}

impl MqOptions {
    /// Create an empty declaration set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an alias for a raw media-query string.
    ///
    /// Re-declaring an alias replaces its query in place, keeping the
    /// original declaration order.
    pub fn query(mut self, alias: impl Into<String>, raw: impl Into<String>) -> Self {
        let alias = alias.into();
        let raw = raw.into();
        if let Some(entry) = self.queries.iter_mut().find(|(a, _)| *a == alias) {
            entry.1 = raw;
        } else {
            self.queries.push((alias, raw));
        }
        self
    }

    /// Discard all inherited aliases; only this component's own
    /// declarations will be in force for it and its descendants.
    pub fn isolated(mut self) -> Self {
        self.isolated = true;
        self
    }

    /// Whether this declaration set opts out of inheritance.
    pub fn is_isolated(&self) -> bool {
        self.isolated
    }

    /// Iterate over `(alias, raw query)` pairs in declaration order.
    pub fn queries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.queries.iter().map(|(a, q)| (a.as_str(), q.as_str()))
    }

    /// Look up the raw query string declared for an alias.
    pub fn get(&self, alias: &str) -> Option<&str> {
        self.queries
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, q)| q.as_str())
    }

    /// Number of declared aliases.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// True when no alias is declared (the `isolated` flag alone does not
    /// count as a declaration).
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_order_is_preserved() {
        let opts = MqOptions::new()
            .query("tablet", "(max-width: 1024px)")
            .query("desktop", "(min-width: 1024px)");

        let aliases: Vec<&str> = opts.queries().map(|(a, _)| a).collect();
        assert_eq!(aliases, vec!["tablet", "desktop"]);
    }

    #[test]
    fn test_redeclare_replaces_in_place() {
        let opts = MqOptions::new()
            .query("tablet", "(max-width: 1024px)")
            .query("phone", "(max-width: 700px)")
            .query("tablet", "(max-width: 900px)");

        assert_eq!(opts.len(), 2);
        assert_eq!(opts.get("tablet"), Some("(max-width: 900px)"));
        let aliases: Vec<&str> = opts.queries().map(|(a, _)| a).collect();
        assert_eq!(aliases, vec!["tablet", "phone"]);
    }

    #[test]
    fn test_isolated_flag() {
        let opts = MqOptions::new().query("phone", "(max-width: 700px)").isolated();
        assert!(opts.is_isolated());
        assert_eq!(opts.len(), 1);
    }
}
