//! Reflex: reactive data plumbing for hierarchical state machine engines.
//!
//! Reflex is the data backbone of a behavior-execution engine: a shared
//! [`store::Store`] of named field bags stamped by one logical clock,
//! [`need::Need`] guard predicates that read it, and a rule-driven
//! [`logging::Logger`] that observes it under an explicit START/RUN/STOP
//! lifecycle. Everything is single-threaded and step-driven: the external
//! loop advances the clock, mutates shares, evaluates needs, and delivers
//! lifecycle signals, one at a time.
//!
//! # Core Concepts
//!
//! - **Share**: a named, ordered field bag that records when it was last
//!   written
//! - **Need**: a pure guard predicate, bound by name and resolved once
//! - **Mark/Marker**: checkpoints against shares, refreshed on frame entry,
//!   answering "has this changed since?"
//! - **Log/Logger**: tab-separated output streams fired by rules like
//!   Always, Update, Change, Streak, and Deck
//!
//! # Example
//!
//! ```rust
//! use reflex::binding::Registry;
//! use reflex::need::{Comparison, Need};
//! use reflex::store::Store;
//! use reflex::fields;
//!
//! let mut store = Store::new("mission");
//! let heading = store.create("pose.heading");
//! heading.borrow_mut().update(fields! { "value" => 0.0 });
//!
//! let mut on_course = Need::direct(
//!     "onCourse", "pose.heading", "value", Comparison::Eq, 90.0, 0.5,
//! );
//! on_course
//!     .resolve(&mut store, &Registry::new(), &Registry::new())
//!     .unwrap();
//! assert!(!on_course.evaluate());
//!
//! store.advance_stamp(0.125);
//! heading.borrow_mut().set("value", 89.8);
//! assert!(on_course.evaluate());
//! ```

pub mod binding;
pub mod logging;
pub mod need;
pub mod store;
pub mod tasking;

// Re-export commonly used types
pub use binding::{Clones, Link, Named, Registry, ResolveError};
pub use logging::{Log, LogBuilder, LogError, Logger, LoggerStatus, Rule};
pub use need::{Comparison, Frame, FrameRef, Marker, Need, NeedKind};
pub use store::{Clock, Deck, FieldBag, Mark, Share, ShareRef, Store, Value};
pub use tasking::{Tasker, TaskerRef, TaskerStatus};
