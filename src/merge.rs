//! Merge Resolver - computes the effective declaration set of an instance.
//!
//! The effective set is the alias -> query mapping actually in force for a
//! component: the ancestor's entries that were not overridden plus the
//! component's own, unless the component is isolated (then ancestor entries
//! are excluded entirely).
//!
//! Rules, in order:
//! - no own declarations: the ancestor set passes through unchanged (or the
//!   result is empty at the root);
//! - own declarations with `isolated`: own entries only, regardless of name
//!   overlap;
//! - otherwise: union, own entries winning on name collision.
//!
//! A component that re-declares an inherited alias with the *identical* raw
//! string is a no-op override: the entry stays inherited so the existing
//! binding is reused, and a configuration warning is emitted.

use crate::diag;
use crate::types::MqOptions;

/// Where an effective entry came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Declared by this component; mount creates a fresh binding.
    Own,
    /// Inherited from the ancestor; mount reuses the ancestor's binding.
    Inherited,
}

/// One alias in force for an instance.
#[derive(Clone, Debug)]
pub struct EffectiveEntry {
    pub alias: String,
    pub raw: String,
    pub origin: Origin,
}

/// The merged alias -> query mapping in force for one instance.
///
/// Entries keep their order: ancestor entries first, own entries appended
/// (an override updates the ancestor's slot in place).
#[derive(Clone, Debug, Default)]
pub struct EffectiveSet {
    entries: Vec<EffectiveEntry>,
}

impl EffectiveSet {
    /// Entries in force, in order.
    pub fn entries(&self) -> &[EffectiveEntry] {
        &self.entries
    }

    /// Look up one alias.
    pub fn get(&self, alias: &str) -> Option<&EffectiveEntry> {
        self.entries.iter().find(|e| e.alias == alias)
    }

    /// Whether an alias is in force.
    pub fn contains(&self, alias: &str) -> bool {
        self.get(alias).is_some()
    }

    /// Alias names in order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.alias.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The same set as seen by a descendant: every entry becomes inherited.
    fn as_inherited(&self) -> EffectiveSet {
        EffectiveSet {
            entries: self
                .entries
                .iter()
                .map(|e| EffectiveEntry {
                    alias: e.alias.clone(),
                    raw: e.raw.clone(),
                    origin: Origin::Inherited,
                })
                .collect(),
        }
    }
}

/// Resolve the effective declaration set for one instance.
///
/// `own` is the instance's static declarations (isolation included),
/// `ancestor` the parent's already-resolved effective set.
pub fn resolve(own: Option<&MqOptions>, ancestor: Option<&EffectiveSet>) -> EffectiveSet {
    let Some(own) = own else {
        return ancestor.map(EffectiveSet::as_inherited).unwrap_or_default();
    };

    let mut entries: Vec<EffectiveEntry> = if own.is_isolated() {
        Vec::new()
    } else {
        ancestor
            .map(|a| a.as_inherited().entries)
            .unwrap_or_default()
    };

    for (alias, raw) in own.queries() {
        match entries.iter_mut().find(|e| e.alias == alias) {
            Some(existing) if existing.raw == raw => {
                // No-op override: the inherited binding already covers this
                // exact query string, so keep reusing it.
                diag::warn(
                    "merge",
                    &format!(
                        "redundant override: \"{alias}\" re-declares the inherited query \
                         \"{raw}\"; the existing binding is reused"
                    ),
                );
            }
            Some(existing) => {
                existing.raw = raw.to_string();
                existing.origin = Origin::Own;
            }
            None => {
                entries.push(EffectiveEntry {
                    alias: alias.to_string(),
                    raw: raw.to_string(),
                    origin: Origin::Own,
                });
            }
        }
    }

    EffectiveSet { entries }
}

// =============================================================================
// Tests
// =============================================================================
