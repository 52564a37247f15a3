//! # mq-signals
//!
//! Reactive media-query bindings for component trees.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! fine-grained reactivity: each named query alias is backed by one
//! `Signal<bool>` kept current by the injected viewport primitive, and the
//! "currently matching" set is a derived over those signals.
//!
//! ## Architecture
//!
//! ```text
//! MqOptions → Merge Resolver → Effective Set → Query Binder → MatchView → watchers
//! ```
//!
//! Declarations flow top-down at instantiation time: a component's own
//! aliases merge with (or, when isolated, replace) its ancestor's resolved
//! set. Match-state changes flow bottom-up from the viewport primitive into
//! each bound signal, then through the signal graph to any dependent view
//! or `onmedia` callback.
//!
//! ## Modules
//!
//! - [`types`] - Declarations ([`MqOptions`]) and shared aliases
//! - [`viewport`] - The injected `matchMedia` capability and a simulated one
//! - [`binder`] - Live signal-backed bindings for raw query strings
//! - [`merge`] - Inheritance, override and isolation rules
//! - [`instance`] - Per-component lifecycle and the `$mq` accessor
//! - [`view`] - The reactive alias -> bool mapping plus `all`
//! - [`directive`] - Declarative change callbacks (`onmedia`)
//! - [`diag`] - Non-fatal diagnostics channel

pub mod binder;
pub mod diag;
pub mod directive;
pub mod instance;
pub mod merge;
pub mod types;
pub mod view;
pub mod viewport;

// Re-export commonly used items
pub use types::{Cleanup, MqOptions};

pub use binder::{BoundQuery, bind as bind_query};

pub use merge::{EffectiveEntry, EffectiveSet, Origin, resolve};

pub use instance::Instance;

pub use view::MatchView;

pub use directive::{DirectiveError, Filter, MediaCallback, OnMediaBinding, bind as bind_directive};

pub use viewport::{ListenerId, MediaMatcher, MediaQueryList, SimulatedViewport};
