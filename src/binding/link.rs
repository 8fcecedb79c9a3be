//! Deferred name references resolved into live handles.

use std::cell::RefCell;
use std::rc::Rc;

/// Anything a [`Link`] can point at: named so that a resolved link can
/// be reverted to a name when a graph fragment is cloned.
pub trait Named {
    fn name(&self) -> &str;
}

/// A cross-reference that starts life as a plain name and is bound to a
/// live object by a one-time resolve pass.
///
/// Graph descriptions are authored entirely with deferred links; the
/// resolve pass looks each name up in the relevant registry. Cloning a
/// bound fragment reverts links to names so the clone can be re-resolved
/// independently.
#[derive(Clone, Debug)]
pub enum Link<T> {
    /// An unbound name, as authored.
    Deferred(String),
    /// A live handle, installed by resolution.
    Resolved(Rc<RefCell<T>>),
}

impl<T> Link<T> {
    /// A fresh unbound link.
    pub fn deferred(name: impl Into<String>) -> Self {
        Link::Deferred(name.into())
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Link::Resolved(_))
    }

    /// The live handle, if resolution has happened.
    pub fn handle(&self) -> Option<Rc<RefCell<T>>> {
        match self {
            Link::Resolved(handle) => Some(handle.clone()),
            Link::Deferred(_) => None,
        }
    }
}

impl<T: Named> Link<T> {
    /// The referenced name: the authored name while deferred, the
    /// target's current name once resolved.
    pub fn name(&self) -> String {
        match self {
            Link::Deferred(name) => name.clone(),
            Link::Resolved(handle) => handle.borrow().name().to_string(),
        }
    }
}
