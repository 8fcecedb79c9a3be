//! Minimal schedulable-unit surface consumed by Done and Status needs.
//!
//! The real scheduler lives outside this crate; needs only ever read a
//! tasker's completion flag and current status.

use crate::binding::Named;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle on a [`Tasker`].
pub type TaskerRef = Rc<RefCell<Tasker>>;

/// Lifecycle status a schedulable unit reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskerStatus {
    Readied,
    Started,
    Running,
    Stopped,
    Aborted,
}

/// A schedulable unit as seen by needs: a name, a completion flag, and a
/// current status. The driving scheduler owns both flags.
#[derive(Clone, Debug)]
pub struct Tasker {
    name: String,
    status: TaskerStatus,
    done: bool,
}

impl Tasker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TaskerStatus::Readied,
            done: false,
        }
    }

    /// A fresh tasker behind a shared handle, ready for a registry.
    pub fn shared(name: impl Into<String>) -> TaskerRef {
        Rc::new(RefCell::new(Self::new(name)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> TaskerStatus {
        self.status
    }

    pub fn set_status(&mut self, status: TaskerStatus) {
        self.status = status;
    }

    pub fn done(&self) -> bool {
        self.done
    }

    pub fn set_done(&mut self, done: bool) {
        self.done = done;
    }
}

impl Named for Tasker {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tasker_is_readied_and_not_done() {
        let tasker = Tasker::new("mover");
        assert_eq!(tasker.status(), TaskerStatus::Readied);
        assert!(!tasker.done());
    }

    #[test]
    fn flags_are_settable() {
        let tasker = Tasker::shared("mover");
        tasker.borrow_mut().set_status(TaskerStatus::Running);
        tasker.borrow_mut().set_done(true);

        assert_eq!(tasker.borrow().status(), TaskerStatus::Running);
        assert!(tasker.borrow().done());
    }

    #[test]
    fn status_roundtrips_through_json() {
        let status = TaskerStatus::Aborted;
        let json = serde_json::to_string(&status).unwrap();
        let back: TaskerStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status, back);
    }
}
