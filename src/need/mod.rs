//! Guard predicates evaluated against the shared store.
//!
//! A need is authored with deferred name references, bound once by
//! `resolve`, and then evaluated as a pure predicate by the frame
//! scheduler. Staleness needs additionally install a marker entry
//! action on the frame whose entry defines "since".
//!
//! All predicate logic here is pure; the only side effects are the
//! one-time marker installations performed by `resolve`.

mod marker;

pub use marker::{Frame, FrameRef, Marker};

use crate::binding::{Clones, Link, Named, Registry, ResolveError};
use crate::store::{Share, ShareRef, Store, Value};
use crate::tasking::{Tasker, TaskerStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, trace};

/// Comparison operator for direct and indirect needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Eq,
    Lt,
    Le,
    Ge,
    Gt,
    Ne,
}

/// A comparison operator token that is none of `== < <= >= > !=`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown comparison operator '{0}'")]
pub struct ComparisonParseError(pub String);

impl FromStr for Comparison {
    type Err = ComparisonParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Comparison::Eq),
            "<" => Ok(Comparison::Lt),
            "<=" => Ok(Comparison::Le),
            ">=" => Ok(Comparison::Ge),
            ">" => Ok(Comparison::Gt),
            "!=" => Ok(Comparison::Ne),
            other => Err(ComparisonParseError(other.to_string())),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Comparison::Eq => "==",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Ge => ">=",
            Comparison::Gt => ">",
            Comparison::Ne => "!=",
        };
        write!(f, "{token}")
    }
}

impl Comparison {
    /// Compare `state` against `goal`.
    ///
    /// Numeric operands use the tolerance band for `==` and `!=`:
    /// `==` holds on `goal - |tol| <= state <= goal + |tol|`, `!=` on
    /// `state <= goal - |tol| || state >= goal + |tol|`; the orderings
    /// compare plainly and ignore tolerance. Non-numeric operands fall
    /// back to exact (in)equality for `==`/`!=` and to lexicographic
    /// order when both are text; anything else is false.
    pub fn check(self, state: &Value, goal: &Value, tolerance: f64) -> bool {
        let tol = tolerance.abs();
        match (state.as_f64(), goal.as_f64()) {
            (Some(s), Some(g)) => match self {
                Comparison::Eq => (g - tol) <= s && s <= (g + tol),
                Comparison::Lt => s < g,
                Comparison::Le => s <= g,
                Comparison::Ge => s >= g,
                Comparison::Gt => s > g,
                Comparison::Ne => s <= (g - tol) || s >= (g + tol),
            },
            _ => match self {
                Comparison::Eq => state == goal,
                Comparison::Ne => state != goal,
                ordering => match (state.as_text(), goal.as_text()) {
                    (Some(s), Some(g)) => match ordering {
                        Comparison::Lt => s < g,
                        Comparison::Le => s <= g,
                        Comparison::Ge => s >= g,
                        Comparison::Gt => s > g,
                        _ => false,
                    },
                    _ => false,
                },
            },
        }
    }
}

/// The predicate variants a need can carry.
#[derive(Clone, Debug)]
pub enum NeedKind {
    /// Unconditionally true.
    Always,
    /// The tasker's completion flag.
    Done { tasker: Link<Tasker> },
    /// The tasker's status equals the target.
    Status {
        tasker: Link<Tasker>,
        status: TaskerStatus,
    },
    /// Truthiness of one share field.
    Boolean { share: Link<Share>, field: String },
    /// Share field compared against a literal goal.
    Direct {
        share: Link<Share>,
        field: String,
        comparison: Comparison,
        goal: Value,
        tolerance: f64,
    },
    /// Share field compared against a goal read from another share.
    Indirect {
        share: Link<Share>,
        field: String,
        comparison: Comparison,
        goal: Link<Share>,
        goal_field: String,
        tolerance: f64,
    },
    /// The share was written since the tagged mark was refreshed.
    Updated {
        share: Link<Share>,
        tag: String,
        frame: Link<Frame>,
    },
    /// The share's fields differ from the tagged mark's snapshot.
    Changed {
        share: Link<Share>,
        tag: String,
        frame: Link<Frame>,
    },
}

/// A named guard predicate.
///
/// # Example
///
/// ```rust
/// use reflex::need::{Comparison, Need};
/// use reflex::store::Store;
/// use reflex::binding::Registry;
/// use reflex::fields;
///
/// let mut store = Store::new("test");
/// store
///     .create("pose.heading")
///     .borrow_mut()
///     .update(fields! { "value" => 5.0 });
///
/// let mut need = Need::direct(
///     "onCourse", "pose.heading", "value", Comparison::Eq, 5.5, 0.5,
/// );
/// need.resolve(&mut store, &Registry::new(), &Registry::new()).unwrap();
/// assert!(need.evaluate());
/// ```
#[derive(Clone, Debug)]
pub struct Need {
    name: String,
    kind: NeedKind,
}

impl Need {
    pub fn new(name: impl Into<String>, kind: NeedKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn always(name: impl Into<String>) -> Self {
        Self::new(name, NeedKind::Always)
    }

    pub fn done(name: impl Into<String>, tasker: &str) -> Self {
        Self::new(
            name,
            NeedKind::Done {
                tasker: Link::deferred(tasker),
            },
        )
    }

    pub fn status(name: impl Into<String>, tasker: &str, status: TaskerStatus) -> Self {
        Self::new(
            name,
            NeedKind::Status {
                tasker: Link::deferred(tasker),
                status,
            },
        )
    }

    pub fn boolean(name: impl Into<String>, share: &str, field: &str) -> Self {
        Self::new(
            name,
            NeedKind::Boolean {
                share: Link::deferred(share),
                field: field.to_string(),
            },
        )
    }

    pub fn direct(
        name: impl Into<String>,
        share: &str,
        field: &str,
        comparison: Comparison,
        goal: impl Into<Value>,
        tolerance: f64,
    ) -> Self {
        Self::new(
            name,
            NeedKind::Direct {
                share: Link::deferred(share),
                field: field.to_string(),
                comparison,
                goal: goal.into(),
                tolerance,
            },
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn indirect(
        name: impl Into<String>,
        share: &str,
        field: &str,
        comparison: Comparison,
        goal_share: &str,
        goal_field: &str,
        tolerance: f64,
    ) -> Self {
        Self::new(
            name,
            NeedKind::Indirect {
                share: Link::deferred(share),
                field: field.to_string(),
                comparison,
                goal: Link::deferred(goal_share),
                goal_field: goal_field.to_string(),
                tolerance,
            },
        )
    }

    pub fn updated(name: impl Into<String>, share: &str, tag: &str, frame: &str) -> Self {
        Self::new(
            name,
            NeedKind::Updated {
                share: Link::deferred(share),
                tag: tag.to_string(),
                frame: Link::deferred(frame),
            },
        )
    }

    pub fn changed(name: impl Into<String>, share: &str, tag: &str, frame: &str) -> Self {
        Self::new(
            name,
            NeedKind::Changed {
                share: Link::deferred(share),
                tag: tag.to_string(),
                frame: Link::deferred(frame),
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NeedKind {
        &self.kind
    }

    /// Bind every deferred reference.
    ///
    /// Share links bind through the store (creating shares lazily);
    /// tasker and frame links bind through their registries and fail on
    /// a miss. Fallible lookups happen before any mutation, so a failed
    /// resolve leaves nothing half-bound. Staleness kinds ensure the
    /// tagged mark exists and install exactly one marker entry action on
    /// the frame per distinct (share, tag) pair, however often resolve
    /// runs.
    pub fn resolve(
        &mut self,
        store: &mut Store,
        taskers: &Registry<Tasker>,
        frames: &Registry<Frame>,
    ) -> Result<(), ResolveError> {
        let need = self.name.clone();
        match &mut self.kind {
            NeedKind::Always => {}
            NeedKind::Done { tasker } | NeedKind::Status { tasker, .. } => {
                if let Link::Deferred(name) = tasker {
                    let found =
                        taskers
                            .get(name)
                            .ok_or_else(|| ResolveError::UnknownTasker {
                                need: need.clone(),
                                name: name.clone(),
                            })?;
                    *tasker = Link::Resolved(found);
                }
            }
            NeedKind::Boolean { share, .. } | NeedKind::Direct { share, .. } => {
                resolve_share(share, store);
            }
            NeedKind::Indirect { share, goal, .. } => {
                resolve_share(share, store);
                resolve_share(goal, store);
            }
            NeedKind::Updated { share, tag, frame } | NeedKind::Changed { share, tag, frame } => {
                let frame_ref = match frame {
                    Link::Deferred(name) => {
                        frames.get(name).ok_or_else(|| ResolveError::UnknownFrame {
                            need: need.clone(),
                            name: name.clone(),
                        })?
                    }
                    Link::Resolved(handle) => handle.clone(),
                };
                let share_ref = resolve_share(share, store);
                share_ref.borrow_mut().mark(tag);
                let installed = frame_ref
                    .borrow_mut()
                    .install_marker(Marker::new(share_ref.clone(), tag.clone()));
                if installed {
                    debug!(
                        need = %need,
                        share = %share_ref.borrow().name(),
                        tag = %tag,
                        frame = %frame_ref.borrow().name(),
                        "marker installed"
                    );
                }
                *frame = Link::Resolved(frame_ref);
            }
        }
        Ok(())
    }

    /// Evaluate the predicate. Pure: no side effects, no panics for
    /// well-formed bindings. An unresolved link evaluates to false.
    pub fn evaluate(&self) -> bool {
        let result = match &self.kind {
            NeedKind::Always => true,
            NeedKind::Done { tasker } => tasker
                .handle()
                .map_or(false, |t| t.borrow().done()),
            NeedKind::Status { tasker, status } => tasker
                .handle()
                .map_or(false, |t| t.borrow().status() == *status),
            NeedKind::Boolean { share, field } => share.handle().map_or(false, |s| {
                s.borrow().get(field).map_or(false, Value::is_truthy)
            }),
            NeedKind::Direct {
                share,
                field,
                comparison,
                goal,
                tolerance,
            } => share.handle().map_or(false, |s| {
                let s = s.borrow();
                s.get(field)
                    .map_or(false, |state| comparison.check(state, goal, *tolerance))
            }),
            NeedKind::Indirect {
                share,
                field,
                comparison,
                goal,
                goal_field,
                tolerance,
            } => match (share.handle(), goal.handle()) {
                (Some(s), Some(g)) => {
                    let s = s.borrow();
                    let g = g.borrow();
                    match (s.get(field), g.get(goal_field)) {
                        (Some(state), Some(goal)) => comparison.check(state, goal, *tolerance),
                        _ => false,
                    }
                }
                _ => false,
            },
            NeedKind::Updated { share, tag, .. } => share
                .handle()
                .map_or(false, |s| s.borrow().updated_since(tag)),
            NeedKind::Changed { share, tag, .. } => share
                .handle()
                .map_or(false, |s| s.borrow().changed_since(tag)),
        };
        trace!(need = %self.name, result, "need evaluated");
        result
    }

    /// Produce an independent copy with every reference reverted to a
    /// name, consulting `clones` for targets that were themselves cloned.
    /// The original keeps its bindings; the copy re-resolves later
    /// against whatever registries the cloned graph uses.
    pub fn clone_deferred(&self, clones: &Clones) -> Need {
        let kind = match &self.kind {
            NeedKind::Always => NeedKind::Always,
            NeedKind::Done { tasker } => NeedKind::Done {
                tasker: revert(tasker, clones),
            },
            NeedKind::Status { tasker, status } => NeedKind::Status {
                tasker: revert(tasker, clones),
                status: *status,
            },
            NeedKind::Boolean { share, field } => NeedKind::Boolean {
                share: revert(share, clones),
                field: field.clone(),
            },
            NeedKind::Direct {
                share,
                field,
                comparison,
                goal,
                tolerance,
            } => NeedKind::Direct {
                share: revert(share, clones),
                field: field.clone(),
                comparison: *comparison,
                goal: goal.clone(),
                tolerance: *tolerance,
            },
            NeedKind::Indirect {
                share,
                field,
                comparison,
                goal,
                goal_field,
                tolerance,
            } => NeedKind::Indirect {
                share: revert(share, clones),
                field: field.clone(),
                comparison: *comparison,
                goal: revert(goal, clones),
                goal_field: goal_field.clone(),
                tolerance: *tolerance,
            },
            NeedKind::Updated { share, tag, frame } => NeedKind::Updated {
                share: revert(share, clones),
                tag: tag.clone(),
                frame: revert(frame, clones),
            },
            NeedKind::Changed { share, tag, frame } => NeedKind::Changed {
                share: revert(share, clones),
                tag: tag.clone(),
                frame: revert(frame, clones),
            },
        };
        Need {
            name: self.name.clone(),
            kind,
        }
    }
}

fn resolve_share(link: &mut Link<Share>, store: &mut Store) -> ShareRef {
    match link {
        Link::Deferred(name) => {
            let handle = store.create(name);
            *link = Link::Resolved(handle.clone());
            handle
        }
        Link::Resolved(handle) => handle.clone(),
    }
}

fn revert<T: Named>(link: &Link<T>, clones: &Clones) -> Link<T> {
    Link::Deferred(clones.reverted(&link.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use crate::need::marker::Frame;
    use crate::tasking::Tasker;

    fn registries() -> (Registry<Tasker>, Registry<Frame>) {
        (Registry::new(), Registry::new())
    }

    #[test]
    fn comparison_parses_the_six_tokens() {
        assert_eq!("==".parse::<Comparison>().unwrap(), Comparison::Eq);
        assert_eq!("<".parse::<Comparison>().unwrap(), Comparison::Lt);
        assert_eq!("<=".parse::<Comparison>().unwrap(), Comparison::Le);
        assert_eq!(">=".parse::<Comparison>().unwrap(), Comparison::Ge);
        assert_eq!(">".parse::<Comparison>().unwrap(), Comparison::Gt);
        assert_eq!("!=".parse::<Comparison>().unwrap(), Comparison::Ne);
        assert!("~=".parse::<Comparison>().is_err());
    }

    #[test]
    fn eq_uses_tolerance_band() {
        let goal = Value::from(5.0);
        assert!(Comparison::Eq.check(&Value::from(5.4), &goal, 0.5));
        assert!(Comparison::Eq.check(&Value::from(4.6), &goal, -0.5));
        assert!(!Comparison::Eq.check(&Value::from(5.6), &goal, 0.5));
    }

    #[test]
    fn eq_with_zero_tolerance_is_exact() {
        let goal = Value::from(5.0);
        assert!(Comparison::Eq.check(&Value::from(5.0), &goal, 0.0));
        assert!(!Comparison::Eq.check(&Value::from(5.0001), &goal, 0.0));
    }

    #[test]
    fn ne_holds_outside_the_band() {
        let goal = Value::from(5.0);
        assert!(Comparison::Ne.check(&Value::from(6.0), &goal, 0.5));
        assert!(Comparison::Ne.check(&Value::from(4.0), &goal, 0.5));
        assert!(!Comparison::Ne.check(&Value::from(5.2), &goal, 0.5));
    }

    #[test]
    fn string_operands_fall_back_to_equality() {
        let goal = Value::from("east");
        assert!(Comparison::Eq.check(&Value::from("east"), &goal, 10.0));
        assert!(!Comparison::Eq.check(&Value::from("west"), &goal, 10.0));
        assert!(Comparison::Ne.check(&Value::from("west"), &goal, 10.0));
        assert!(Comparison::Lt.check(&Value::from("abc"), &goal, 0.0));
    }

    #[test]
    fn mixed_operands_never_order() {
        assert!(!Comparison::Lt.check(&Value::from("abc"), &Value::from(1.0), 0.0));
        assert!(!Comparison::Ge.check(&Value::from(1.0), &Value::from("abc"), 0.0));
    }

    #[test]
    fn always_need_is_true() {
        assert!(Need::always("anytime").evaluate());
    }

    #[test]
    fn done_need_reads_the_tasker_flag() {
        let mut store = Store::new("test");
        let (mut taskers, frames) = registries();
        let mover = Tasker::shared("mover");
        taskers.insert(mover.clone());

        let mut need = Need::done("moverDone", "mover");
        need.resolve(&mut store, &taskers, &frames).unwrap();
        assert!(!need.evaluate());

        mover.borrow_mut().set_done(true);
        assert!(need.evaluate());
    }

    #[test]
    fn status_need_compares_statuses() {
        let mut store = Store::new("test");
        let (mut taskers, frames) = registries();
        let mover = Tasker::shared("mover");
        taskers.insert(mover.clone());

        let mut need = Need::status("moverRunning", "mover", TaskerStatus::Running);
        need.resolve(&mut store, &taskers, &frames).unwrap();
        assert!(!need.evaluate());

        mover.borrow_mut().set_status(TaskerStatus::Running);
        assert!(need.evaluate());
    }

    #[test]
    fn boolean_need_uses_truthiness() {
        let mut store = Store::new("test");
        let (taskers, frames) = registries();
        let share = store.create("flags.armed");
        share.borrow_mut().set("value", 0.0);

        let mut need = Need::boolean("armed", "flags.armed", "value");
        need.resolve(&mut store, &taskers, &frames).unwrap();
        assert!(!need.evaluate());

        share.borrow_mut().set("value", 1.0);
        assert!(need.evaluate());
    }

    #[test]
    fn boolean_need_is_false_for_missing_field() {
        let mut store = Store::new("test");
        let (taskers, frames) = registries();

        let mut need = Need::boolean("armed", "flags.armed", "value");
        need.resolve(&mut store, &taskers, &frames).unwrap();
        assert!(!need.evaluate());
    }

    #[test]
    fn indirect_need_reads_goal_from_a_share() {
        let mut store = Store::new("test");
        let (taskers, frames) = registries();
        store
            .create("pose.heading")
            .borrow_mut()
            .update(fields! { "value" => 4.8 });
        store
            .create("goal.heading")
            .borrow_mut()
            .update(fields! { "value" => 5.0 });

        let mut need = Need::indirect(
            "onCourse",
            "pose.heading",
            "value",
            Comparison::Eq,
            "goal.heading",
            "value",
            0.5,
        );
        need.resolve(&mut store, &taskers, &frames).unwrap();
        assert!(need.evaluate());

        store
            .create("goal.heading")
            .borrow_mut()
            .set("value", 9.0);
        assert!(!need.evaluate());
    }

    #[test]
    fn unresolved_need_evaluates_false() {
        let need = Need::boolean("armed", "flags.armed", "value");
        assert!(!need.evaluate());
    }

    #[test]
    fn resolve_fails_on_unknown_tasker() {
        let mut store = Store::new("test");
        let (taskers, frames) = registries();

        let mut need = Need::done("moverDone", "mover");
        let err = need.resolve(&mut store, &taskers, &frames).unwrap_err();
        assert_eq!(
            err,
            ResolveError::UnknownTasker {
                need: "moverDone".to_string(),
                name: "mover".to_string(),
            }
        );
    }

    #[test]
    fn resolve_fails_on_unknown_frame_without_marking() {
        let mut store = Store::new("test");
        let (taskers, frames) = registries();

        let mut need = Need::updated("fresh", "pose.heading", "hold", "missing");
        let err = need.resolve(&mut store, &taskers, &frames).unwrap_err();
        assert!(matches!(err, ResolveError::UnknownFrame { .. }));
        assert!(store.fetch("pose.heading").is_none());
    }

    #[test]
    fn updated_need_marks_and_tracks() {
        let mut store = Store::new("test");
        let (taskers, mut frames) = registries();
        let frame = Frame::shared("hold");
        frames.insert(frame.clone());

        let mut need = Need::updated("fresh", "pose.heading", "hold", "hold");
        need.resolve(&mut store, &taskers, &frames).unwrap();

        let share = store.fetch("pose.heading").unwrap();
        assert!(!need.evaluate());

        frame.borrow().enter();
        share.borrow_mut().set("value", 1.0);
        assert!(need.evaluate());

        store.advance_stamp(0.125);
        frame.borrow().enter();
        assert!(!need.evaluate());
    }

    #[test]
    fn changed_need_compares_against_snapshot() {
        let mut store = Store::new("test");
        let (taskers, mut frames) = registries();
        let frame = Frame::shared("hold");
        frames.insert(frame.clone());

        let share = store.create("pose.heading");
        share.borrow_mut().set("value", 1.0);

        let mut need = Need::changed("moved", "pose.heading", "hold", "hold");
        need.resolve(&mut store, &taskers, &frames).unwrap();
        assert!(!need.evaluate());

        frame.borrow().enter();
        store.advance_stamp(0.125);
        share.borrow_mut().set("value", 1.0);
        assert!(!need.evaluate());

        share.borrow_mut().set("value", 2.0);
        assert!(need.evaluate());
    }

    #[test]
    fn resolve_twice_installs_one_marker() {
        let mut store = Store::new("test");
        let (taskers, mut frames) = registries();
        let frame = Frame::shared("hold");
        frames.insert(frame.clone());

        let mut need = Need::updated("fresh", "pose.heading", "hold", "hold");
        need.resolve(&mut store, &taskers, &frames).unwrap();
        need.resolve(&mut store, &taskers, &frames).unwrap();

        let mut again = Need::updated("fresh2", "pose.heading", "hold", "hold");
        again.resolve(&mut store, &taskers, &frames).unwrap();

        assert_eq!(frame.borrow().enacts().len(), 1);
    }

    #[test]
    fn clone_reverts_references_to_names() {
        let mut store = Store::new("test");
        let (mut taskers, frames) = registries();
        taskers.insert(Tasker::shared("mover"));

        let mut need = Need::done("moverDone", "mover");
        need.resolve(&mut store, &taskers, &frames).unwrap();

        let mut clones = Clones::new();
        clones.record("mover", "mover-copy");
        let copy = need.clone_deferred(&clones);

        match copy.kind() {
            NeedKind::Done { tasker } => {
                assert!(!tasker.is_resolved());
                assert_eq!(tasker.name(), "mover-copy");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
        // original keeps its binding
        match need.kind() {
            NeedKind::Done { tasker } => assert!(tasker.is_resolved()),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn uncloned_references_revert_to_their_own_names() {
        let mut store = Store::new("test");
        let (taskers, frames) = registries();

        let mut need = Need::boolean("armed", "flags.armed", "value");
        need.resolve(&mut store, &taskers, &frames).unwrap();

        let copy = need.clone_deferred(&Clones::new());
        match copy.kind() {
            NeedKind::Boolean { share, .. } => assert_eq!(share.name(), "flags.armed"),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn clone_then_reresolve_matches_original_behavior() {
        let mut store = Store::new("test");
        let (taskers, frames) = registries();
        store
            .create("pose.heading")
            .borrow_mut()
            .update(fields! { "value" => 5.0 });

        let mut need = Need::direct(
            "onCourse",
            "pose.heading",
            "value",
            Comparison::Eq,
            5.0,
            0.25,
        );
        need.resolve(&mut store, &taskers, &frames).unwrap();

        let mut copy = need.clone_deferred(&Clones::new());
        copy.resolve(&mut store, &taskers, &frames).unwrap();

        assert_eq!(need.evaluate(), copy.evaluate());
        store.create("pose.heading").borrow_mut().set("value", 9.0);
        assert_eq!(need.evaluate(), copy.evaluate());
    }
}
