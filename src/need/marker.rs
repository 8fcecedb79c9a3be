//! Frames and the mark-refreshing entry actions installed on them.

use crate::binding::Named;
use crate::store::ShareRef;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

/// Shared handle on a [`Frame`].
pub type FrameRef = Rc<RefCell<Frame>>;

/// Entry-time side effect that refreshes one mark.
///
/// Installed on a frame the first time a staleness need is resolved for
/// its (share, tag) pair; applying it stamps the mark and snapshots the
/// share's fields.
#[derive(Clone, Debug)]
pub struct Marker {
    share: ShareRef,
    tag: String,
}

impl Marker {
    pub fn new(share: ShareRef, tag: impl Into<String>) -> Self {
        Self {
            share,
            tag: tag.into(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Refresh the mark this marker guards.
    pub fn apply(&self) {
        self.share.borrow_mut().update_mark(&self.tag);
    }

    /// True iff this marker guards the same (share, tag) pair. Share
    /// identity is the handle, not the name.
    pub fn matches(&self, share: &ShareRef, tag: &str) -> bool {
        Rc::ptr_eq(&self.share, share) && self.tag == tag
    }
}

/// A control-flow frame, reduced to what this crate needs: a name and
/// the entry actions installed on it. The frame scheduler proper is an
/// external collaborator.
#[derive(Clone, Debug)]
pub struct Frame {
    name: String,
    enacts: Vec<Marker>,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enacts: Vec::new(),
        }
    }

    /// A fresh frame behind a shared handle, ready for a registry.
    pub fn shared(name: impl Into<String>) -> FrameRef {
        Rc::new(RefCell::new(Self::new(name)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The installed entry actions, in installation order.
    pub fn enacts(&self) -> &[Marker] {
        &self.enacts
    }

    /// True iff a marker for this (share, tag) pair is already installed.
    pub fn has_marker(&self, share: &ShareRef, tag: &str) -> bool {
        self.enacts.iter().any(|m| m.matches(share, tag))
    }

    /// Install a marker unless one for its (share, tag) pair already
    /// exists. Returns whether anything was installed.
    pub fn install_marker(&mut self, marker: Marker) -> bool {
        if self.has_marker(&marker.share, &marker.tag) {
            return false;
        }
        self.enacts.push(marker);
        true
    }

    /// Run every installed entry action, in installation order.
    pub fn enter(&self) {
        trace!(frame = %self.name, enacts = self.enacts.len(), "frame entered");
        for marker in &self.enacts {
            marker.apply();
        }
    }
}

impl Named for Frame {
    fn name(&self) -> &str {
        &self.name
    }
}
