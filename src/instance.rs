//! Instance State Attachment - per-component lifecycle integration.
//!
//! Each component instance carries a three-state machine:
//!
//! ```text
//! Uninitialized → Declared → Mounted
//! ```
//!
//! The Declared transition runs the merge resolver against the parent's
//! effective set at configuration time. The Mounted transition binds every
//! effective alias to a live match state and assembles the
//! [`MatchView`](crate::view::MatchView) exposed through [`Instance::mq`].
//! Mounted is terminal; teardown only releases the listeners this instance
//! itself created.
//!
//! The tree is plain ownership: a parent owns its children in creation
//! order, a child keeps a non-owning back-pointer for lookup. The matcher
//! handle is cloned down from the root, so every instance can bind without
//! global state.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use mq_signals::{Instance, MqOptions};
//! use mq_signals::viewport::{MediaMatcher, SimulatedViewport};
//!
//! let matcher: Rc<dyn MediaMatcher> = Rc::new(SimulatedViewport::new(1400));
//! let root = Instance::root(
//!     Some(matcher),
//!     Some(MqOptions::new()
//!         .query("tablet", "(max-width: 1024px)")
//!         .query("desktop", "(min-width: 1024px)")),
//! );
//! root.mount();
//! assert_eq!(root.mq().all(), vec!["desktop".to_string()]);
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::binder::{self, BoundQuery};
use crate::merge::{self, EffectiveSet, Origin};
use crate::types::MqOptions;
use crate::view::MatchView;
use crate::viewport::MediaMatcher;

// =============================================================================
// Binding Set
// =============================================================================

/// The live bindings in force for a mounted scope (alias -> BoundQuery).
/// Shared by `Rc` with descendants that merely inherit.
#[derive(Default)]
struct BindingSet {
    entries: Vec<(String, Rc<BoundQuery>)>,
}

impl BindingSet {
    fn get(&self, alias: &str) -> Option<Rc<BoundQuery>> {
        self.entries
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, bound)| bound.clone())
    }

    fn insert(&mut self, alias: String, bound: Rc<BoundQuery>) {
        self.entries.push((alias, bound));
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

struct MountedState {
    effective: Rc<EffectiveSet>,
    bindings: Rc<BindingSet>,
    view: Rc<MatchView>,
    /// Bindings this instance created itself (as opposed to reused from
    /// the parent). These are the listeners teardown releases.
    owned: Vec<Rc<BoundQuery>>,
}

enum Lifecycle {
    Uninitialized,
    Declared { effective: Rc<EffectiveSet> },
    Mounted(MountedState),
}

// =============================================================================
// Instance
// =============================================================================

/// One component instance in the tree.
pub struct Instance {
    parent: Weak<Instance>,
    children: RefCell<Vec<Rc<Instance>>>,
    matcher: Option<Rc<dyn MediaMatcher>>,
    options: Option<MqOptions>,
    /// The pre-mount `$mq` placeholder, so the accessor always returns a
    /// view (headless/server evaluation reads it before any mount).
    placeholder: Rc<MatchView>,
    state: RefCell<Lifecycle>,
}

impl Instance {
    /// Create the root instance. The matcher handle (if any) is shared
    /// with every descendant.
    pub fn root(matcher: Option<Rc<dyn MediaMatcher>>, options: Option<MqOptions>) -> Rc<Self> {
        let instance = Rc::new(Self {
            parent: Weak::new(),
            children: RefCell::new(Vec::new()),
            matcher,
            options,
            placeholder: MatchView::empty(),
            state: RefCell::new(Lifecycle::Uninitialized),
        });
        instance.declare();
        instance
    }

    /// Create a child instance. The child's Declared transition runs
    /// immediately, after the parent's (parent-before-child ordering is
    /// structural: a child cannot exist before its parent is Declared).
    pub fn spawn_child(self: &Rc<Self>, options: Option<MqOptions>) -> Rc<Self> {
        let child = Rc::new(Self {
            parent: Rc::downgrade(self),
            children: RefCell::new(Vec::new()),
            matcher: self.matcher.clone(),
            options,
            placeholder: MatchView::empty(),
            state: RefCell::new(Lifecycle::Uninitialized),
        });
        self.children.borrow_mut().push(child.clone());
        child.declare();
        child
    }

    /// Parent instance, if any.
    pub fn parent(&self) -> Option<Rc<Instance>> {
        self.parent.upgrade()
    }

    /// Whether this instance is the tree root.
    pub fn is_root(&self) -> bool {
        self.parent.upgrade().is_none()
    }

    /// Children in creation order.
    pub fn children(&self) -> Vec<Rc<Instance>> {
        self.children.borrow().clone()
    }

    /// Uninitialized → Declared: resolve the effective declaration set
    /// against the parent's. Idempotent - re-entering on a Declared or
    /// Mounted instance returns the already-resolved set without redoing
    /// any merge work.
    pub fn declare(&self) -> Rc<EffectiveSet> {
        {
            let state = self.state.borrow();
            match &*state {
                Lifecycle::Declared { effective } => return effective.clone(),
                Lifecycle::Mounted(mounted) => return mounted.effective.clone(),
                Lifecycle::Uninitialized => {}
            }
        }

        let ancestor = self.parent.upgrade().map(|p| p.declare());
        let effective = Rc::new(merge::resolve(self.options.as_ref(), ancestor.as_deref()));
        *self.state.borrow_mut() = Lifecycle::Declared {
            effective: effective.clone(),
        };
        effective
    }

    /// Declared → Mounted: bind every effective alias and assemble the
    /// match view. Ancestors are mounted first (their bindings are what
    /// inherited aliases reuse). Mounted is terminal; calling again
    /// returns the existing view.
    pub fn mount(self: &Rc<Self>) -> Rc<MatchView> {
        if let Lifecycle::Mounted(mounted) = &*self.state.borrow() {
            return mounted.view.clone();
        }

        let parent_parts = self.parent.upgrade().and_then(|p| {
            p.mount();
            p.mounted_parts()
        });
        let effective = self.declare();

        let mounted = if self.options.is_some() {
            self.assemble(effective, parent_parts)
        } else if let Some((bindings, view)) = parent_parts {
            // Pure inheritance: proxy the parent's view and bindings by
            // reference. No new view, no new subscriptions.
            MountedState {
                effective,
                bindings,
                view,
                owned: Vec::new(),
            }
        } else {
            MountedState {
                effective,
                bindings: Rc::new(BindingSet::default()),
                view: self.placeholder.clone(),
                owned: Vec::new(),
            }
        };

        let view = mounted.view.clone();
        *self.state.borrow_mut() = Lifecycle::Mounted(mounted);
        view
    }

    fn assemble(
        &self,
        effective: Rc<EffectiveSet>,
        parent_parts: Option<(Rc<BindingSet>, Rc<MatchView>)>,
    ) -> MountedState {
        let mut bindings = BindingSet::default();
        let mut signals = Vec::with_capacity(effective.len());
        let mut owned = Vec::new();

        for entry in effective.entries() {
            let reused = match entry.origin {
                Origin::Own => None,
                Origin::Inherited => parent_parts
                    .as_ref()
                    .and_then(|(parent_bindings, _)| parent_bindings.get(&entry.alias)),
            };
            let bound = match reused {
                Some(bound) => bound,
                None => {
                    // Fresh binding: our own declaration, or an inherited
                    // alias whose owner was dropped before this instance
                    // mounted. Either way the listener is ours to release.
                    let bound = binder::bind(self.matcher.as_ref(), &entry.alias, &entry.raw);
                    owned.push(bound.clone());
                    bound
                }
            };
            signals.push((entry.alias.clone(), bound.signal()));
            bindings.insert(entry.alias.clone(), bound);
        }

        MountedState {
            effective,
            bindings: Rc::new(bindings),
            view: MatchView::new(signals),
            owned,
        }
    }

    fn mounted_parts(&self) -> Option<(Rc<BindingSet>, Rc<MatchView>)> {
        match &*self.state.borrow() {
            Lifecycle::Mounted(mounted) => Some((mounted.bindings.clone(), mounted.view.clone())),
            _ => None,
        }
    }

    /// The `$mq` accessor: the current resolved match view. Before mount
    /// this is an empty per-instance placeholder, never a missing value.
    pub fn mq(&self) -> Rc<MatchView> {
        match &*self.state.borrow() {
            Lifecycle::Mounted(mounted) => mounted.view.clone(),
            _ => self.placeholder.clone(),
        }
    }

    /// The effective declaration set, once Declared.
    pub fn effective(&self) -> Option<Rc<EffectiveSet>> {
        match &*self.state.borrow() {
            Lifecycle::Declared { effective } => Some(effective.clone()),
            Lifecycle::Mounted(mounted) => Some(mounted.effective.clone()),
            Lifecycle::Uninitialized => None,
        }
    }

    /// The live binding behind an alias, once Mounted. Inherited aliases
    /// return the ancestor's binding (same `Rc`).
    pub fn binding(&self, alias: &str) -> Option<Rc<BoundQuery>> {
        match &*self.state.borrow() {
            Lifecycle::Mounted(mounted) => mounted.bindings.get(alias),
            _ => None,
        }
    }

    /// Whether the instance has reached the Mounted state.
    pub fn is_mounted(&self) -> bool {
        matches!(&*self.state.borrow(), Lifecycle::Mounted(_))
    }

    /// Tear down this subtree: children first, then deregister the
    /// listeners of every binding this instance created itself. Inherited
    /// bindings are left alone - their owner releases them.
    pub fn teardown(&self) {
        for child in self.children.borrow_mut().drain(..) {
            child.teardown();
        }

        if let Lifecycle::Mounted(mounted) = &*self.state.borrow() {
            for bound in &mounted.owned {
                bound.unbind();
            }
        }
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.state.borrow() {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Declared { .. } => "declared",
            Lifecycle::Mounted(_) => "mounted",
        };
        f.debug_struct("Instance")
            .field("state", &state)
            .field("root", &self.is_root())
            .field("children", &self.children.borrow().len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::SimulatedViewport;
    use spark_signals::flush_sync;

    fn root_opts() -> MqOptions {
        MqOptions::new()
            .query("tablet", "(max-width: 1024px)")
            .query("desktop", "(min-width: 1024px)")
    }

    fn tree(width: u32) -> (SimulatedViewport, Rc<Instance>) {
        let viewport = SimulatedViewport::new(width);
        let matcher: Rc<dyn MediaMatcher> = Rc::new(viewport.clone());
        let root = Instance::root(Some(matcher), Some(root_opts()));
        (viewport, root)
    }

    #[test]
    fn test_mq_is_always_a_view() {
        let root = Instance::root(None, None);
        // Before mount: the placeholder, stable across reads.
        assert!(root.mq().is_empty());
        assert!(Rc::ptr_eq(&root.mq(), &root.mq()));
    }

    #[test]
    fn test_declare_is_idempotent() {
        let (_viewport, root) = tree(1400);
        let child = root.spawn_child(Some(MqOptions::new().query("phone", "(max-width: 700px)")));

        let first = child.declare();
        let second = child.declare();
        assert!(Rc::ptr_eq(&first, &second));

        child.mount();
        let third = child.declare();
        assert!(Rc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_mount_is_terminal() {
        let (_viewport, root) = tree(1400);
        let first = root.mount();
        let second = root.mount();
        assert!(Rc::ptr_eq(&first, &second));
        assert!(root.is_mounted());
    }

    #[test]
    fn test_child_without_declarations_proxies_parent_view() {
        let (_viewport, root) = tree(1400);
        let child = root.spawn_child(None);

        root.mount();
        child.mount();

        assert!(Rc::ptr_eq(&root.mq(), &child.mq()));
    }

    #[test]
    fn test_mount_orders_parent_first() {
        let (_viewport, root) = tree(1400);
        let child = root.spawn_child(None);

        // Mounting the child alone pulls the parent up first.
        child.mount();
        assert!(root.is_mounted());
        assert!(Rc::ptr_eq(&root.mq(), &child.mq()));
    }

    #[test]
    fn test_inherited_alias_reuses_parent_binding() {
        let (_viewport, root) = tree(1400);
        let child = root.spawn_child(Some(MqOptions::new().query("phone", "(max-width: 700px)")));

        root.mount();
        child.mount();

        let root_desktop = root.binding("desktop").unwrap();
        let child_desktop = child.binding("desktop").unwrap();
        assert!(Rc::ptr_eq(&root_desktop, &child_desktop));

        // Own alias gets its own binding and its own view.
        assert!(child.binding("phone").is_some());
        assert!(!Rc::ptr_eq(&root.mq(), &child.mq()));
    }

    #[test]
    fn test_override_gets_fresh_binding() {
        let (_viewport, root) = tree(1400);
        let child = root.spawn_child(Some(MqOptions::new().query("tablet", "(max-width: 700px)")));

        root.mount();
        child.mount();

        let root_tablet = root.binding("tablet").unwrap();
        let child_tablet = child.binding("tablet").unwrap();
        assert!(!Rc::ptr_eq(&root_tablet, &child_tablet));
        assert_eq!(child_tablet.raw(), "(max-width: 700px)");
        assert_eq!(root_tablet.raw(), "(max-width: 1024px)");
    }

    #[test]
    fn test_isolated_child_sees_only_its_own() {
        let (_viewport, root) = tree(1400);
        let child = root.spawn_child(Some(
            MqOptions::new().query("phone", "(max-width: 700px)").isolated(),
        ));

        root.mount();
        let view = child.mount();

        assert!(!view.contains("desktop"));
        assert!(!view.contains("tablet"));
        assert!(view.contains("phone"));
    }

    #[test]
    fn test_headless_mount_is_static() {
        let root = Instance::root(None, Some(root_opts()));
        let view = root.mount();

        assert!(view.contains("desktop"));
        assert!(!view.matches("desktop"));
        assert!(view.all().is_empty());
    }

    #[test]
    fn test_dropped_parent_falls_back_to_fresh_owned_bindings() {
        let (viewport, root) = tree(1400);
        let child = root.spawn_child(Some(MqOptions::new().query("phone", "(max-width: 700px)")));

        // The child is Declared with inherited entries, but its parent
        // (and the parent's bindings) are gone before it mounts.
        drop(root);
        let view = child.mount();

        // Inherited aliases were re-bound fresh and are live.
        assert!(view.matches("desktop"));
        viewport.set_width(600);
        flush_sync();
        assert!(!view.matches("desktop"));
        assert!(view.matches("phone"));

        // The fallback bindings belong to this instance: teardown
        // releases their listeners.
        child.teardown();
        viewport.set_width(1400);
        flush_sync();
        assert!(!view.matches("desktop"));
        assert!(view.matches("phone"));
    }

    #[test]
    fn test_teardown_releases_only_own_bindings() {
        let (viewport, root) = tree(1400);
        let child = root.spawn_child(Some(MqOptions::new().query("tablet", "(max-width: 700px)")));

        root.mount();
        child.mount();
        let child_view = child.mq();

        child.teardown();

        viewport.set_width(600);
        flush_sync();

        // The child's own binding is dead: its listener was removed.
        assert!(!child_view.matches("tablet"));
        // The inherited binding (owned by the root) still updates.
        assert!(child_view.matches("desktop") == root.mq().matches("desktop"));
        assert!(root.mq().matches("tablet"));
    }
}
