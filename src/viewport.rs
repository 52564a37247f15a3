//! Viewport matching primitive - the injected `matchMedia` capability.
//!
//! The core never evaluates media queries itself. It talks to whatever the
//! host supplies through [`MediaMatcher`]: a capability that, given a raw
//! query string, hands back a live [`MediaQueryList`] reporting the current
//! match state and accepting change listeners.
//!
//! [`SimulatedViewport`] is a width-driven implementation for tests and
//! headless runs. It understands only `(min-width: Npx)` and
//! `(max-width: Npx)`; anything else never matches. It is an adapter over
//! the trait seam, not a media-query parser for the core.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Identifies one registered change listener for removal.
pub type ListenerId = usize;

/// Live match state for one raw media-query string.
///
/// Mirrors the shape of the DOM `MediaQueryList`: a current boolean plus
/// change-listener registration. Listeners receive the new match state,
/// one call at a time, in no guaranteed order across lists.
pub trait MediaQueryList {
    /// Current match state.
    fn matches(&self) -> bool;

    /// Register a change listener. The listener stays registered until
    /// removed with the returned id.
    fn add_listener(&self, listener: Box<dyn Fn(bool)>) -> ListenerId;

    /// Deregister a listener. Removing an unknown id is a no-op.
    fn remove_listener(&self, id: ListenerId);
}

/// The injected viewport-matching capability (`window.matchMedia`
/// equivalent).
pub trait MediaMatcher {
    /// Obtain the live match state for a raw query string.
    fn match_media(&self, query: &str) -> Rc<dyn MediaQueryList>;
}

// =============================================================================
// Simulated Viewport
// =============================================================================

struct SimList {
    query: String,
    matches: Cell<bool>,
    listeners: RefCell<Vec<(ListenerId, Box<dyn Fn(bool)>)>>,
    next_id: Cell<usize>,
}

impl SimList {
    fn notify(&self, matches: bool) {
        let listeners = self.listeners.borrow();
        for (_, listener) in listeners.iter() {
            listener(matches);
        }
    }
}

impl MediaQueryList for SimList {
    fn matches(&self) -> bool {
        self.matches.get()
    }

    fn add_listener(&self, listener: Box<dyn Fn(bool)>) -> ListenerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners
            .borrow_mut()
            .retain(|(listener_id, _)| *listener_id != id);
    }
}

struct SimInner {
    width: Cell<u32>,
    lists: RefCell<Vec<Rc<SimList>>>,
}

/// Width-driven viewport for tests and headless evaluation.
///
/// # Example
///
/// ```ignore
/// use std::rc::Rc;
/// use mq_signals::viewport::{MediaMatcher, SimulatedViewport};
///
/// let viewport = SimulatedViewport::new(1400);
/// let list = viewport.match_media("(min-width: 1024px)");
/// assert!(list.matches());
///
/// viewport.set_width(800); // fires change listeners that flipped
/// assert!(!list.matches());
/// ```
#[derive(Clone)]
pub struct SimulatedViewport {
    inner: Rc<SimInner>,
}

impl SimulatedViewport {
    /// Create a viewport at the given width in pixels.
    pub fn new(width: u32) -> Self {
        Self {
            inner: Rc::new(SimInner {
                width: Cell::new(width),
                lists: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Current width in pixels.
    pub fn width(&self) -> u32 {
        self.inner.width.get()
    }

    /// Resize the viewport. Every handed-out list is re-evaluated; the
    /// listeners of lists whose match state flipped are fired, one at a
    /// time.
    pub fn set_width(&self, width: u32) {
        self.inner.width.set(width);

        let lists = self.inner.lists.borrow();
        for list in lists.iter() {
            let now = evaluate(&list.query, width);
            if now != list.matches.get() {
                list.matches.set(now);
                list.notify(now);
            }
        }
    }
}

impl MediaMatcher for SimulatedViewport {
    fn match_media(&self, query: &str) -> Rc<dyn MediaQueryList> {
        // One list per unique query string; repeat calls share it.
        if let Some(list) = self
            .inner
            .lists
            .borrow()
            .iter()
            .find(|l| l.query == query)
        {
            return list.clone();
        }

        let list = Rc::new(SimList {
            query: query.to_string(),
            matches: Cell::new(evaluate(query, self.inner.width.get())),
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        });
        self.inner.lists.borrow_mut().push(list.clone());
        list
    }
}

/// Evaluate a `(min-width: Npx)` / `(max-width: Npx)` query against a
/// width. Anything the simulator does not understand never matches.
fn evaluate(query: &str, width: u32) -> bool {
    let body = query.trim().trim_start_matches('(').trim_end_matches(')');
    let Some((feature, value)) = body.split_once(':') else {
        return false;
    };
    let Ok(px) = value.trim().trim_end_matches("px").trim().parse::<u32>() else {
        return false;
    };

    match feature.trim() {
        "min-width" => width >= px,
        "max-width" => width <= px,
        _ => false,
    }
}

// =============================================================================
// Tests
// =============================================================================
