//! Directive Dispatcher - declarative change callbacks (`v-onmedia`).
//!
//! Binds a callback to the aliases of a resolved match view, with the
//! template syntax `onmedia[:not][.modifier...]="callback"` mapped onto
//! [`OnMediaBinding`]. For every alias the filter selects, the callback is
//! invoked once synchronously at bind time if that alias currently matches
//! (flagged as the initial signal), and again on every subsequent flip.
//!
//! Binding mistakes are reported through the diagnostics channel and the
//! binding is skipped; they never propagate into host control flow.

use std::cell::Cell;
use std::rc::Rc;

use spark_signals::effect;
use thiserror::Error;

use crate::diag;
use crate::types::Cleanup;
use crate::view::MatchView;

/// Callback invoked as `(alias, matches, initial)`.
pub type MediaCallback = Rc<dyn Fn(&str, bool, bool)>;

/// Bind-time arguments, mirroring the host directive-binding record:
/// the resolved callback value, the raw expression text it came from,
/// the optional `:argument` and the `.modifier` set.
///
/// `value` is `None` when the expression did not resolve to something
/// callable - that is a binding error, not a panic.
pub struct OnMediaBinding {
    pub value: Option<MediaCallback>,
    pub expression: String,
    pub arg: Option<String>,
    pub modifiers: Vec<String>,
}

impl OnMediaBinding {
    /// A binding for a resolved callback with no argument or modifiers.
    pub fn new(expression: impl Into<String>, value: Option<MediaCallback>) -> Self {
        Self {
            value,
            expression: expression.into(),
            arg: None,
            modifiers: Vec::new(),
        }
    }

    /// Set the directive argument (`onmedia:not`).
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arg = Some(arg.into());
        self
    }

    /// Add a modifier (`onmedia.tablet`).
    pub fn modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifiers.push(modifier.into());
        self
    }
}

impl std::fmt::Debug for OnMediaBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnMediaBinding")
            .field("expression", &self.expression)
            .field("arg", &self.arg)
            .field("modifiers", &self.modifiers)
            .field("callable", &self.value.is_some())
            .finish()
    }
}

/// Why a directive binding was skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectiveError {
    /// The expression did not resolve to a callback.
    #[error("expression \"{0}\" doesn't resolve to a callback, so there's nothing to call on change")]
    NotCallable(String),
    /// An argument was given without naming any alias to exclude.
    #[error("a \":not\" argument was passed without any modifiers")]
    BareNot,
    /// The only recognized argument is `not`.
    #[error("unknown argument \":{0}\" was passed")]
    UnknownArg(String),
}

/// Which aliases of a view a binding applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    /// Every alias (no modifiers, or an explicit `any` modifier).
    Any,
    /// Only the named aliases.
    Only(Vec<String>),
    /// Every alias except the named ones (`:not`).
    Except(Vec<String>),
}

impl Filter {
    /// Parse the argument/modifier pair of a directive binding.
    pub fn parse(arg: Option<&str>, modifiers: &[String]) -> Result<Filter, DirectiveError> {
        let any = modifiers.is_empty() || modifiers.iter().any(|m| m == "any");

        match arg {
            Some(_) if any => Err(DirectiveError::BareNot),
            Some("not") => Ok(Filter::Except(modifiers.to_vec())),
            Some(other) => Err(DirectiveError::UnknownArg(other.to_string())),
            None if any => Ok(Filter::Any),
            None => Ok(Filter::Only(modifiers.to_vec())),
        }
    }

    /// Whether the filter selects an alias.
    pub fn selects(&self, alias: &str) -> bool {
        match self {
            Filter::Any => true,
            Filter::Only(names) => names.iter().any(|n| n == alias),
            Filter::Except(names) => !names.iter().any(|n| n == alias),
        }
    }
}

/// Bind a directive to a resolved match view.
///
/// For each selected alias: an immediate `callback(alias, true, true)` if
/// the alias currently matches (nothing for non-matching aliases), then a
/// watcher invoking `callback(alias, new_value, false)` on every flip.
/// Within one alias the initial call always precedes any change-driven
/// call; across aliases no order is guaranteed.
///
/// Returns the cleanup that stops every watcher, or the error that made
/// the binding skippable (already reported through diagnostics).
pub fn bind(binding: OnMediaBinding, view: &Rc<MatchView>) -> Result<Cleanup, DirectiveError> {
    let Some(callback) = binding.value else {
        let err = DirectiveError::NotCallable(binding.expression);
        diag::warn("onmedia", &err.to_string());
        return Err(err);
    };

    let filter = match Filter::parse(binding.arg.as_deref(), &binding.modifiers) {
        Ok(filter) => filter,
        Err(err) => {
            diag::warn("onmedia", &err.to_string());
            return Err(err);
        }
    };

    let mut stops: Vec<Cleanup> = Vec::new();

    for alias in view.aliases().filter(|a| filter.selects(a)) {
        let Some(sig) = view.signal(alias) else {
            continue;
        };

        let current = sig.get();
        if current {
            callback(alias, true, true);
        }

        let previous = Cell::new(current);
        let name = alias.to_string();
        let cb = callback.clone();
        let stop = effect(move || {
            let now = sig.get();
            if now != previous.get() {
                previous.set(now);
                cb(&name, now, false);
            }
        });
        stops.push(Box::new(stop));
    }

    Ok(Box::new(move || {
        for stop in stops {
            stop();
        }
    }))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Instance;
    use crate::types::MqOptions;
    use crate::viewport::{MediaMatcher, SimulatedViewport};
    use spark_signals::flush_sync;
    use std::cell::RefCell;

    type Calls = Rc<RefCell<Vec<(String, bool, bool)>>>;

    fn recording() -> (Calls, MediaCallback) {
        let calls: Calls = Rc::new(RefCell::new(Vec::new()));
        let calls_clone = calls.clone();
        let callback: MediaCallback = Rc::new(move |alias: &str, matches, initial| {
            calls_clone
                .borrow_mut()
                .push((alias.to_string(), matches, initial));
        });
        (calls, callback)
    }

    // The root must stay alive for the duration of a test: dropping it
    // drops its BoundQueries, whose Drop deregisters the viewport
    // listeners and freezes every match signal.
    fn mounted_root(width: u32) -> (SimulatedViewport, Rc<Instance>, Rc<MatchView>) {
        let viewport = SimulatedViewport::new(width);
        let matcher: Rc<dyn MediaMatcher> = Rc::new(viewport.clone());
        let root = Instance::root(
            Some(matcher),
            Some(
                MqOptions::new()
                    .query("tablet", "(max-width: 1024px)")
                    .query("desktop", "(min-width: 1024px)"),
            ),
        );
        let view = root.mount();
        (viewport, root, view)
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!(Filter::parse(None, &[]), Ok(Filter::Any));
        assert_eq!(
            Filter::parse(None, &["any".to_string(), "tablet".to_string()]),
            Ok(Filter::Any)
        );
        assert_eq!(
            Filter::parse(None, &["tablet".to_string()]),
            Ok(Filter::Only(vec!["tablet".to_string()]))
        );
        assert_eq!(
            Filter::parse(Some("not"), &["tablet".to_string()]),
            Ok(Filter::Except(vec!["tablet".to_string()]))
        );
        assert_eq!(Filter::parse(Some("not"), &[]), Err(DirectiveError::BareNot));
        assert_eq!(
            Filter::parse(Some("not"), &["any".to_string()]),
            Err(DirectiveError::BareNot)
        );
        assert_eq!(
            Filter::parse(Some("only"), &["tablet".to_string()]),
            Err(DirectiveError::UnknownArg("only".to_string()))
        );
    }

    #[test]
    fn test_initial_call_for_matching_aliases_only() {
        let (_viewport, _root, view) = mounted_root(1400);
        let (calls, callback) = recording();

        let cleanup = bind(OnMediaBinding::new("handler", Some(callback)), &view).unwrap();

        // desktop matches at 1400, tablet doesn't: exactly one initial call.
        assert_eq!(*calls.borrow(), vec![("desktop".to_string(), true, true)]);
        cleanup();
    }

    #[test]
    fn test_change_calls_after_initial() {
        let (viewport, _root, view) = mounted_root(1400);
        let (calls, callback) = recording();

        let _cleanup = bind(OnMediaBinding::new("handler", Some(callback)), &view).unwrap();
        calls.borrow_mut().clear();

        viewport.set_width(1000);
        flush_sync();

        // Both aliases flipped exactly once each.
        let mut seen = calls.borrow().clone();
        seen.sort();
        assert_eq!(
            seen,
            vec![
                ("desktop".to_string(), false, false),
                ("tablet".to_string(), true, false),
            ]
        );
    }

    #[test]
    fn test_not_filter_never_fires_excluded_alias() {
        let (viewport, _root, view) = mounted_root(1400);
        let (calls, callback) = recording();

        let _cleanup = bind(
            OnMediaBinding::new("handler", Some(callback))
                .arg("not")
                .modifier("tablet"),
            &view,
        )
        .unwrap();

        viewport.set_width(1000);
        flush_sync();
        viewport.set_width(1400);
        flush_sync();

        assert!(!calls.borrow().is_empty());
        assert!(calls.borrow().iter().all(|(alias, _, _)| alias != "tablet"));
    }

    #[test]
    fn test_only_filter_scopes_to_named_aliases() {
        let (viewport, _root, view) = mounted_root(1400);
        let (calls, callback) = recording();

        let _cleanup = bind(
            OnMediaBinding::new("handler", Some(callback)).modifier("tablet"),
            &view,
        )
        .unwrap();

        // tablet doesn't match at bind time: no initial call.
        assert!(calls.borrow().is_empty());

        viewport.set_width(1000);
        flush_sync();
        assert_eq!(*calls.borrow(), vec![("tablet".to_string(), true, false)]);
    }

    #[test]
    fn test_missing_callback_is_reported_not_thrown() {
        let (_viewport, _root, view) = mounted_root(1400);

        let warnings = Rc::new(std::cell::Cell::new(0));
        let warnings_clone = warnings.clone();
        let off = diag::on_warning(move |context, _| {
            if context == "onmedia" {
                warnings_clone.set(warnings_clone.get() + 1);
            }
        });

        let result = bind(OnMediaBinding::new("notAMethod", None), &view);
        off();

        let err = match result {
            Err(err) => err,
            Ok(_) => panic!("binding should have been skipped"),
        };
        assert_eq!(err, DirectiveError::NotCallable("notAMethod".to_string()));
        assert_eq!(warnings.get(), 1);
    }

    #[test]
    fn test_cleanup_stops_watchers() {
        let (viewport, _root, view) = mounted_root(1400);
        let (calls, callback) = recording();

        let cleanup = bind(OnMediaBinding::new("handler", Some(callback)), &view).unwrap();
        calls.borrow_mut().clear();
        cleanup();

        viewport.set_width(1000);
        flush_sync();
        assert!(calls.borrow().is_empty());
    }
}
